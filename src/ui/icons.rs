pub struct Icons;

impl Icons {
    pub const ROCKET: &str = "🚀";
    pub const CHECK: &str = "✅";
    pub const CROSS: &str = "❌";
    pub const WARN: &str = "⚠️";
    pub const INFO: &str = "ℹ️";
    pub const STATS: &str = "📊";
    pub const DATABASE: &str = "🗄️";
    pub const INBOX: &str = "📥";
    pub const NEW: &str = "✨";
    pub const SKIP: &str = "⏭️";
    pub const SEARCH: &str = "🔍";
    pub const CALENDAR: &str = "📅";
    pub const STOP: &str = "🛑";
}
