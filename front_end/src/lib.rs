pub mod diagnostics;
pub mod limits;
pub mod qualifier;
pub mod scanner;
pub mod source_location;
pub mod types;
pub mod version;

#[cfg(test)]
mod tests;
