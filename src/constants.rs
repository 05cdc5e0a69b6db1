/// Constants used throughout sortwise
/// Extension tables, fallback folder names and labeling vocabulary live here

/// File extensions for image types (binary fast path)
pub const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "svg", "webp", "heic", "bmp", "tif", "tiff", "ico",
];

/// File extensions for video types (binary fast path)
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mkv", "mov", "avi", "wmv", "webm", "flv", "m4v"];

/// File extensions for audio types (binary fast path)
pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "flac", "m4a", "ogg", "aac", "wma"];

/// File extensions for executables and installers (binary fast path)
pub const EXECUTABLE_EXTENSIONS: &[&str] = &[
    "exe", "msi", "bat", "bin", "iso", "dmg", "app", "apk", "deb", "rpm", "dll", "so",
];

/// File extensions for archive types (binary fast path)
pub const ARCHIVE_EXTENSIONS: &[&str] = &["zip", "rar", "7z", "tar", "gz", "bz2", "xz", "tgz"];

/// File extensions read as plain UTF-8 text
pub const TEXT_EXTENSIONS: &[&str] = &[
    "txt", "text", "md", "markdown", "rst", "log", "py", "js", "ts", "c", "cpp", "h", "hpp",
    "java", "rs", "go", "rb", "json", "xml", "yml", "yaml", "toml", "ini", "sql", "sh", "html",
    "htm", "css", "tex",
];

/// File extensions for comma-separated tables (head lines only)
pub const CSV_EXTENSIONS: &[&str] = &["csv", "tsv"];

/// Folder names for the binary fast path categories
pub const IMAGES_FOLDER: &str = "Images";
pub const VIDEOS_FOLDER: &str = "Videos";
pub const AUDIO_FOLDER: &str = "Audio";
pub const EXECS_FOLDER: &str = "Execs";
pub const ARCHIVES_FOLDER: &str = "Archives";

/// Fallback folder for files with no extension and no usable text
pub const MISC_FOLDER: &str = "Misc_Files";

/// Folder used by the file-extension mode when a file has no extension
pub const NO_EXTENSION_FOLDER: &str = "no_extension";

/// Device names Windows refuses as file or folder names
pub const RESERVED_NAMES: &[&str] = &[
    "con", "prn", "aux", "nul", "com1", "com2", "com3", "com4", "com5", "com6", "com7", "com8",
    "com9", "lpt1", "lpt2", "lpt3", "lpt4", "lpt5", "lpt6", "lpt7", "lpt8", "lpt9",
];

/// Words that never make a useful folder keyword
pub const STOP_WORDS: &[&str] = &[
    "a", "about", "after", "all", "also", "an", "and", "any", "are", "as", "at", "be", "been",
    "but", "by", "can", "could", "did", "do", "does", "for", "from", "had", "has", "have", "he",
    "her", "his", "how", "i", "if", "in", "into", "is", "it", "its", "may", "me", "more", "most",
    "my", "no", "not", "of", "on", "or", "our", "out", "she", "so", "some", "than", "that", "the",
    "their", "them", "then", "there", "these", "they", "this", "to", "up", "us", "was", "we",
    "were", "what", "when", "which", "who", "will", "with", "would", "you", "your", "file",
    "files", "document", "documents", "page", "copy", "new", "final", "untitled",
];

/// Shortest accepted `labeling.max_label_len`; every fixed folder name fits
pub const MIN_LABEL_LEN: usize = 16;

/// Labels the generative model tends to emit that carry no information
pub const GENERIC_LABELS: &[&str] = &["files", "folder", "misc", "stuff", "group", "other"];

/// Default Ollama endpoint
pub const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";
