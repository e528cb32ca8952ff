// src/settings.rs
use std::env;
use std::net::SocketAddr;

use log::warn;

pub const ADDR_VAR: &str = "NFC_SERVICE_ADDR";
pub const TAG_PAGES_VAR: &str = "NFC_TAG_PAGES";

pub const DEFAULT_ADDR: ([u8; 4], u16) = ([127, 0, 0, 1], 3500);

/// NTAG216 user + configuration pages
pub const DEFAULT_TAG_PAGES: usize = 231;

#[derive(Debug, Clone)]
pub struct Settings {
    pub addr: SocketAddr,
    pub tag_pages: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(DEFAULT_ADDR),
            tag_pages: DEFAULT_TAG_PAGES,
        }
    }
}

impl Settings {
    /// Defaults overridden by the environment, unparsable values are ignored
    pub fn from_env() -> Self {
        let mut settings = Self::default();

        if let Ok(addr) = env::var(ADDR_VAR) {
            match addr.parse() {
                Ok(addr) => settings.addr = addr,
                Err(err) => warn!("ignoring {ADDR_VAR}={addr}: {err}"),
            }
        }

        if let Ok(pages) = env::var(TAG_PAGES_VAR) {
            match pages.parse() {
                Ok(pages) if pages <= u8::MAX as usize + 1 => settings.tag_pages = pages,
                Ok(pages) => warn!("ignoring {TAG_PAGES_VAR}={pages}: above the 256 page limit"),
                Err(err) => warn!("ignoring {TAG_PAGES_VAR}={pages}: {err}"),
            }
        }

        settings
    }
}
