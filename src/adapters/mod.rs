// Adapters layer: concrete implementations for the external systems the
// engine talks to through the domain ports.

pub mod download;
pub mod gdrive;
pub mod vk;
pub mod yandex;
