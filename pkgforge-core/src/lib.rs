#[macro_use]
extern crate anyhow;

#[macro_use]
extern crate lazy_static;

pub mod archive;
pub mod digest;
pub mod error;
pub mod manifest;
pub mod package;
pub mod recipe;
pub mod walk;

pub use anyhow::{anyhow, Context as ErrContext, Error, Result};
pub use error::PackagingError;

#[macro_export]
macro_rules! err {
    ($it:ident) => {
       Err($crate::Error::msg($it))
    };
    ($lit:literal) => {
        Err($crate::Error::msg($lit))
    };
    ($($tt:tt)*) => {
        Err($crate::Error::msg(format!($($tt)*)))
    };
}
