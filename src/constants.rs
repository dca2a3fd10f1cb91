// src/constants.rs

/// Name of the application directory inside the OS config directory (`~/.config/cmdtray`).
pub const APP_DIR_NAME: &str = "cmdtray";

/// Command tree document used on every platform except Windows.
pub const COMMANDS_FILENAME: &str = "commands.json";

/// Command tree document used on Windows hosts.
pub const WIN_COMMANDS_FILENAME: &str = "win-commands.json";

/// Execution history document (array, newest first).
pub const HISTORY_FILENAME: &str = "history.json";

/// Favorites document (label -> reference).
pub const FAVORITES_FILENAME: &str = "favorites.json";

/// Engine settings file.
pub const SETTINGS_FILENAME: &str = "settings.toml";

/// Directory (inside the config dir) holding command tree snapshots.
pub const BACKUPS_DIR: &str = "backups";

/// Snapshot file names are `commands_<YYYYMMDD_HHMMSS>[_<n>].json`.
pub const BACKUP_PREFIX: &str = "commands_";
pub const BACKUP_SUFFIX: &str = ".json";
pub const BACKUP_STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Directory of the bundle that ships default documents.
pub const BUNDLED_CONFIG_DIR: &str = "config";

/// Resource subpaths probed, in order, for relative icon specifiers.
pub const RESOURCE_SUBDIRS: [&str; 2] = ["resources/icons", "resources"];

/// Icon used when nothing else resolves (relative to the base directory).
pub const DEFAULT_ICON_RELATIVE: &str = "resources/icons/icon.png";

/// Name of the shared icon cache directory under the system temp dir.
pub const ICON_CACHE_DIR_NAME: &str = "cmdtray-icons";

/// Hard upper bound for a single icon download.
pub const ICON_DOWNLOAD_TIMEOUT_SECS: u64 = 10;

/// Reserved metadata key inside every group; never a child.
pub const ICON_KEY: &str = "icon";

/// Group name used by old installations to embed favorites in the tree.
pub const LEGACY_FAVORITES_GROUP: &str = "Favorites";

/// Token replaced by the user's answer to a command prompt.
pub const PROMPT_PLACEHOLDER: &str = "{promptInput}";

/// Maximum number of history entries kept.
pub const HISTORY_LIMIT: usize = 10;

/// Separator between segments of a command path (`Group.Sub.Label`).
pub const PATH_SEPARATOR: char = '.';

/// Separator used when rendering a command's location for humans.
pub const DISPLAY_SEPARATOR: &str = " → ";
