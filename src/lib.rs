#![recursion_limit = "1024"]

extern crate rand;
#[macro_use]
extern crate serde_derive;
extern crate serde;
extern crate serde_json;
extern crate rayon;
extern crate image;

#[macro_use]
extern crate error_chain;

#[macro_use]
extern crate log;

pub mod errors;
#[macro_use]
pub mod linalg;
pub mod hough;
pub mod quaternion;
pub mod types;
