pub mod annotations;
pub mod document;
pub mod molecule;
pub mod spectrum;
