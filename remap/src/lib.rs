mod color;
mod gradient;
mod image;
mod query;
mod session;
mod sparse;
mod tally;
mod tools;

pub use crate::{
    color::Rgb,
    gradient::GradientMap,
    query::Strategy,
    session::{ColorMap, Options, ShapeMismatch},
    sparse::SparseMap,
    tally::Tally,
    tools::{apply, dump, gradient, learn, swatch, Error},
};
