//! Host and resource configuration.
//!
//! The scheme and trailing-slash properties are usually configured from the
//! URL template a node is created with: `https://example.com/orders/` means
//! the `orders` resource ignores plain-HTTP requests and redirects requests
//! whose URL lacks the trailing slash.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::error::RouterError;

/// Configuration of a host or resource.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// The node handles a request even when no child matches the request's
    /// next path segment. The unmatched tail is available to the handler as
    /// the remaining path.
    pub subtree_handler: bool,

    /// The node responds only over https.
    pub secure: bool,

    /// Redirect insecure requests to the https equivalent instead of
    /// responding with "404 Not Found". Implies `secure`.
    pub redirect_insecure_request: bool,

    /// The node's URL ends with a trailing slash; requests to the slashless
    /// form are redirected.
    pub trailing_slash: bool,

    /// Respond with "404 Not Found" when the trailing slash of the request
    /// URL disagrees with the node's, instead of redirecting.
    pub strict_on_trailing_slash: bool,

    /// Serve regardless of whether the request URL's trailing slash agrees
    /// with the node's.
    pub leniency_on_trailing_slash: bool,

    /// Serve unclean paths (empty segments, `.` and `..`) as-is instead of
    /// redirecting to the cleaned-up URL.
    pub leniency_on_unclean_path: bool,

    /// Shorthand setting both `leniency_on_trailing_slash` and
    /// `leniency_on_unclean_path`.
    pub handle_the_path_as_is: bool,
}

impl Config {
    /// The properties set to true, as bit flags.
    pub(crate) fn as_flags(self) -> ConfigFlags {
        let mut flags = ConfigFlags::empty();
        if self.subtree_handler {
            flags |= ConfigFlags::SUBTREE_HANDLER;
        }

        if self.secure {
            flags |= ConfigFlags::SECURE;
        }

        if self.redirect_insecure_request {
            flags |= ConfigFlags::SECURE | ConfigFlags::REDIRECT_INSECURE;
        }

        if self.trailing_slash {
            flags |= ConfigFlags::TRAILING_SLASH;
        }

        if self.strict_on_trailing_slash {
            flags |= ConfigFlags::STRICT_ON_TRAILING_SLASH;
        }

        if self.leniency_on_trailing_slash {
            flags |= ConfigFlags::LENIENT_TRAILING_SLASH;
        }

        if self.leniency_on_unclean_path {
            flags |= ConfigFlags::LENIENT_UNCLEAN_PATH;
        }

        if self.handle_the_path_as_is {
            flags |= ConfigFlags::HANDLE_PATH_AS_IS;
        }

        flags
    }
}

bitflags! {
    /// A node's configuration as bit flags. `ACTIVE` records that the node
    /// has been configured at all; compatibility checks configure an
    /// inactive node instead of comparing against it.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub(crate) struct ConfigFlags: u8 {
        const ACTIVE = 1 << 0;
        const SUBTREE_HANDLER = 1 << 1;
        const SECURE = 1 << 2;
        const REDIRECT_INSECURE = 1 << 3;
        const TRAILING_SLASH = 1 << 4;
        const STRICT_ON_TRAILING_SLASH = 1 << 5;
        const LENIENT_TRAILING_SLASH = 1 << 6;
        const LENIENT_UNCLEAN_PATH = 1 << 7;
        const HANDLE_PATH_AS_IS =
            Self::LENIENT_TRAILING_SLASH.bits() | Self::LENIENT_UNCLEAN_PATH.bits();
    }
}

impl ConfigFlags {
    pub(crate) fn as_config(self) -> Config {
        Config {
            subtree_handler: self.contains(ConfigFlags::SUBTREE_HANDLER),
            secure: self.contains(ConfigFlags::SECURE),
            redirect_insecure_request: self.contains(ConfigFlags::REDIRECT_INSECURE),
            trailing_slash: self.contains(ConfigFlags::TRAILING_SLASH),
            strict_on_trailing_slash: self.contains(ConfigFlags::STRICT_ON_TRAILING_SLASH),
            leniency_on_trailing_slash: self.contains(ConfigFlags::LENIENT_TRAILING_SLASH),
            leniency_on_unclean_path: self.contains(ConfigFlags::LENIENT_UNCLEAN_PATH),
            handle_the_path_as_is: self.contains(ConfigFlags::HANDLE_PATH_AS_IS),
        }
    }

    /// Check the configured flags for compatibility with the requested
    /// properties, or configure them from the request when the node hasn't
    /// been configured yet.
    pub(crate) fn check_compatibility(
        &mut self,
        secure: bool,
        trailing_slash: bool,
        required: Option<ConfigFlags>,
    ) -> Result<(), RouterError> {
        if self.contains(ConfigFlags::ACTIVE) {
            if self.contains(ConfigFlags::SECURE) != secure {
                return Err(RouterError::ConflictingSecurity);
            }

            if !self.contains(ConfigFlags::LENIENT_TRAILING_SLASH)
                && self.contains(ConfigFlags::TRAILING_SLASH) != trailing_slash
            {
                return Err(RouterError::ConflictingTrailingSlash);
            }

            if let Some(required) = required {
                if !self.contains(required) {
                    return Err(RouterError::ConflictingConfig);
                }
            }

            return Ok(());
        }

        *self |= ConfigFlags::ACTIVE;
        if secure {
            *self |= ConfigFlags::SECURE;
        }

        if trailing_slash {
            *self |= ConfigFlags::TRAILING_SLASH;
        }

        if let Some(required) = required {
            *self |= required;
        }

        Ok(())
    }
}
