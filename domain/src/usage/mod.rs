//! Token usage accounting

pub mod token_data;

pub use token_data::{
    ModelTokenData, TokenDataUpdate, merge_token_data, replace_token_data, total_token_data,
};
