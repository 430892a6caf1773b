use serde::Deserialize;

pub const DEFAULT_PAGE_LIMIT: u32 = 20;
pub const MAX_PAGE_LIMIT: u32 = 100;

/// Skip/limit window over a newest-first listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub skip: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    DEFAULT_PAGE_LIMIT
}

impl Default for Page {
    fn default() -> Self {
        Page {
            skip: 0,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

impl Page {
    pub fn clamped(self) -> Self {
        Page {
            skip: self.skip,
            limit: self.limit.clamp(1, MAX_PAGE_LIMIT),
        }
    }
}
