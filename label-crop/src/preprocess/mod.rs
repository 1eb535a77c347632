pub mod crop;
pub mod data_uri;
pub mod decode;
