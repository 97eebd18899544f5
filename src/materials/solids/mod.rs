pub mod elastic;
pub mod snow;
