pub mod get_data;

pub use get_data::get_data_post;
