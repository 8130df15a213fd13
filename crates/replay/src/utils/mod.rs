pub mod observation_file;
pub mod settings;
