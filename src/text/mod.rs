pub mod grouping;
pub mod tokenizer;

pub use grouping::Grouper;
pub use tokenizer::LineTokenizer;
