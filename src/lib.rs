pub mod api;
pub mod config;
pub mod error;
pub mod events;
pub mod feed;
pub mod tasks {
    pub mod controller;
    pub mod presenter;
    pub mod scroll;
}

pub use photo_model::Photo;
