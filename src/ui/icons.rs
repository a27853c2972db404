//! Shared status glyphs, with plain-text fallbacks for terminals without emoji.

use console::Emoji;

// Step indicators
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "[x] ");
pub static ACTIVE: Emoji<'_, '_> = Emoji("▶️  ", "[>] ");
pub static PENDING: Emoji<'_, '_> = Emoji("⚪ ", "[ ] ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "[!] ");

// Views
pub static CHART: Emoji<'_, '_> = Emoji("📊 ", "");
pub static SPARKLE: Emoji<'_, '_> = Emoji("✨ ", "* ");
pub static PACKAGE: Emoji<'_, '_> = Emoji("📦 ", "");
pub static PLUG: Emoji<'_, '_> = Emoji("🔌 ", "");
