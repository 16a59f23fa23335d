pub mod error;
pub use error::KnnError;

#[cfg(test)]
mod tests {
    mod error_tests;
}
