use {
    clap::Parser,
    remap::{Error as RemapError, Options, SparseMap, Strategy},
    serde_json::Error as JsonError,
    std::{
        env, fmt,
        fs::{self, File},
        io::{self, BufWriter, Read, Write},
        path::{Path, PathBuf},
        process::ExitCode,
    },
};

const MAP_NAME: &str = "map";

#[derive(Parser)]
enum Cli {
    /// Learn a color map from pairs of original and recolored .png images
    Learn {
        /// Image files, interleaved: original recolor [original recolor ..]
        images: Vec<PathBuf>,

        /// Map filename ("map" by default)
        #[arg(short, long)]
        name: Option<String>,

        /// Specify output directory (current by default)
        #[arg(short, long)]
        outdir: Option<PathBuf>,

        /// Downscale factor applied to both images before tallying
        #[arg(long, default_value_t = 1.0)]
        scale: f32,
    },
    /// Recolor a .png image with a learned .json color map
    Apply {
        /// A path of image to recolor (stdin by default)
        imagepath: Option<PathBuf>,

        /// Map path (map.json by default)
        mappath: Option<PathBuf>,

        /// Extension strategy (exponential|nearest|fraction|bounded|band)
        #[arg(short, long, default_value = "exponential")]
        strategy: Strategy,

        /// Smoothing exponent for the exponential strategies
        #[arg(short, long, default_value_t = 128)]
        power: u32,

        /// Downscale factor applied before recoloring
        #[arg(long, default_value_t = 1.0)]
        scale: f32,

        /// New image name ("out" by default)
        #[arg(short, long)]
        name: Option<String>,

        /// Specify output directory (current by default)
        #[arg(short, long)]
        outdir: Option<PathBuf>,
    },
    /// Tint a .png image with a gradient map built from a gradient image
    Gradient {
        /// A path of the gradient reference image
        gradientpath: PathBuf,

        /// A path of image to tint (stdin by default)
        imagepath: Option<PathBuf>,

        /// Downscale factor applied to both images
        #[arg(long, default_value_t = 1.0)]
        scale: f32,

        /// Render the sampled/interpolated comparison swatch instead
        #[arg(long)]
        swatch: bool,

        /// New image name ("out" by default)
        #[arg(short, long)]
        name: Option<String>,

        /// Specify output directory (current by default)
        #[arg(short, long)]
        outdir: Option<PathBuf>,
    },
    /// Dump a learned .json color map to a pair of key/value .png images
    Inspect {
        /// Map path (map.json by default)
        mappath: Option<PathBuf>,

        /// Output image name prefix ("map" by default)
        #[arg(short, long)]
        name: Option<String>,

        /// Specify output directory (current by default)
        #[arg(short, long)]
        outdir: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    if let Err(err) = run(Cli::parse()) {
        eprintln!("error: {err}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

fn run(cli: Cli) -> Result<(), Error> {
    match cli {
        Cli::Learn {
            images,
            name,
            outdir,
            scale,
        } => {
            if images.is_empty() || images.len() % 2 != 0 {
                return Err(Error::UnpairedImages(images.len()));
            }

            let data: Vec<Vec<u8>> = images
                .into_iter()
                .map(|path| read_data(Some(path)))
                .collect::<Result<_, _>>()?;

            let pairs = data
                .chunks_exact(2)
                .map(|pair| (pair[0].as_slice(), pair[1].as_slice()));

            let sparse = remap::learn(pairs, scale)?;
            let name = name.as_deref().unwrap_or(MAP_NAME);
            let outdir = make_outdir(outdir)?;
            serialize_map(&sparse, name, &outdir)
        }
        Cli::Apply {
            imagepath,
            mappath,
            strategy,
            power,
            scale,
            name,
            outdir,
        } => {
            let data = read_data(imagepath)?;
            let sparse = read_map(mappath)?;
            let options = Options {
                strategy,
                power,
                ..Options::default()
            };

            let png = remap::apply(&data, sparse, options, scale)?;
            let name = name.as_deref().unwrap_or("out");
            let outdir = make_outdir(outdir)?;
            write_png(&png, name, &outdir)
        }
        Cli::Gradient {
            gradientpath,
            imagepath,
            scale,
            swatch,
            name,
            outdir,
        } => {
            let gradient = read_data(Some(gradientpath))?;
            let png = if swatch {
                remap::swatch(&gradient, scale)?
            } else {
                let data = read_data(imagepath)?;
                remap::gradient(&gradient, &data, scale)?
            };

            let name = name.as_deref().unwrap_or("out");
            let outdir = make_outdir(outdir)?;
            write_png(&png, name, &outdir)
        }
        Cli::Inspect {
            mappath,
            name,
            outdir,
        } => {
            let sparse = read_map(mappath)?;
            let (keys, values) = remap::dump(&sparse)?;
            let name = name.as_deref().unwrap_or(MAP_NAME);
            let outdir = make_outdir(outdir)?;
            write_png(&keys, &format!("{name}_keys"), &outdir)?;
            write_png(&values, &format!("{name}_values"), &outdir)
        }
    }
}

fn read_string(path: Option<PathBuf>) -> Result<String, Error> {
    match path {
        Some(path) => fs::read_to_string(&path).map_err(|_| Error::ReadFile(path)),
        None => io::read_to_string(io::stdin()).map_err(|_| Error::ReadStdin),
    }
}

fn read_data(path: Option<PathBuf>) -> Result<Vec<u8>, Error> {
    let stdin_read = || {
        let mut buf = Vec::new();
        io::stdin()
            .read_to_end(&mut buf)
            .map_err(|_| Error::ReadStdin)?;

        Ok(buf)
    };

    match path {
        Some(path) => fs::read(&path).map_err(|_| Error::ReadFile(path)),
        None => stdin_read(),
    }
}

fn read_map(mappath: Option<PathBuf>) -> Result<SparseMap, Error> {
    let path = mappath
        .or_else(|| {
            let mut curr = env::current_dir().ok()?;
            curr.push(MAP_NAME);
            curr.set_extension("json");
            Some(curr)
        })
        .ok_or(Error::MapPathNotSet)?;

    let src = read_string(Some(path))?;
    Ok(serde_json::from_str(&src)?)
}

fn make_outdir(outdir: Option<PathBuf>) -> Result<PathBuf, Error> {
    let outdir = outdir
        .or_else(|| env::current_dir().ok())
        .ok_or(Error::OutDir)?;

    if !outdir.exists() {
        fs::create_dir_all(&outdir).map_err(|_| Error::OutDir)?;
    }

    Ok(outdir)
}

fn serialize_map(sparse: &SparseMap, name: &str, outdir: &Path) -> Result<(), Error> {
    let mut path = outdir.join(name);
    path.set_extension("json");
    println!("write map ({} entries) to file {path:?}", sparse.len());
    let file = {
        let file = File::create(&path).map_err(|_| Error::CreateFile(path))?;
        BufWriter::new(file)
    };

    serde_json::to_writer(file, sparse).expect("serialize map");
    Ok(())
}

fn write_png(data: &[u8], name: &str, outdir: &Path) -> Result<(), Error> {
    let mut path = outdir.join(name);
    path.set_extension("png");
    println!("write image to file {path:?}");
    let mut file = {
        let file = File::create(&path).map_err(|_| Error::CreateFile(path.clone()))?;
        BufWriter::new(file)
    };

    file.write_all(data).map_err(|_| Error::WriteToFile(path))
}

enum Error {
    ReadFile(PathBuf),
    ReadStdin,
    OutDir,
    CreateFile(PathBuf),
    WriteToFile(PathBuf),
    MapPathNotSet,
    UnpairedImages(usize),
    Remap(RemapError),
    Json(JsonError),
}

impl From<RemapError> for Error {
    fn from(v: RemapError) -> Self {
        Self::Remap(v)
    }
}

impl From<JsonError> for Error {
    fn from(v: JsonError) -> Self {
        Self::Json(v)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::ReadFile(path) => write!(f, "failed to read file {path:?}"),
            Self::ReadStdin => write!(f, "failed to read stdin"),
            Self::OutDir => write!(f, "failed to get output directory"),
            Self::CreateFile(path) => write!(f, "failed to create the file {path:?}"),
            Self::WriteToFile(path) => write!(f, "failed to write file {path:?}"),
            Self::MapPathNotSet => write!(f, "the map path is not set"),
            Self::UnpairedImages(count) => {
                write!(f, "expected an even number of images, got {count}")
            }
            Self::Remap(err) => write!(f, "{err}"),
            Self::Json(err) => write!(f, "{err}"),
        }
    }
}
