pub mod ir;
pub mod sema;

#[cfg(test)]
mod tests;
