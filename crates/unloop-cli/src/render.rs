use colored::Colorize;
use serde::Serialize;
use tabled::{Table, Tabled};
use unloop_core::{
    AnalysisRun, LogEntry, LogLevel, NetworkComposition, Profile, RunState, UserRecord,
};

/// Which classified list the lists view shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ListTab {
    /// Accounts you follow that don't follow back
    NotFollowingBack,
    /// Accounts following you that you don't follow
    Fans,
    Mutuals,
}

impl ListTab {
    fn title(self) -> &'static str {
        match self {
            ListTab::NotFollowingBack => "Not Following Back",
            ListTab::Fans => "Fans",
            ListTab::Mutuals => "Mutuals",
        }
    }

    fn action(self) -> &'static str {
        match self {
            ListTab::NotFollowingBack => "Unfollow",
            ListTab::Fans => "Follow",
            ListTab::Mutuals => "View",
        }
    }

    fn records(self, run: &AnalysisRun) -> &[UserRecord] {
        let result = run.result();
        match self {
            ListTab::NotFollowingBack => &result.one_directional_outbound,
            ListTab::Fans => &result.one_directional_inbound,
            ListTab::Mutuals => &result.mutual,
        }
    }
}

#[derive(Tabled)]
struct UserRow {
    #[tabled(rename = "FID")]
    fid: u64,
    #[tabled(rename = "Handle")]
    handle: String,
    #[tabled(rename = "Bio")]
    bio: String,
    #[tabled(rename = "Link")]
    link: String,
}

impl From<&UserRecord> for UserRow {
    fn from(user: &UserRecord) -> Self {
        Self {
            fid: user.id,
            handle: format!("@{}", user.handle),
            bio: truncate(user.bio.as_deref().unwrap_or(""), 48),
            link: user.profile_url(),
        }
    }
}

fn truncate(text: &str, max: usize) -> String {
    let line = text.lines().next().unwrap_or("");
    if line.chars().count() <= max {
        return line.to_string();
    }
    let cut: String = line.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", cut)
}

pub fn header(run: &AnalysisRun) {
    match run.profile() {
        Some(profile) => println!("{}", profile_line(profile)),
        None => println!(
            "{} FID: {}",
            "Unknown profile".dimmed(),
            run.subject().map(|s| s.to_string()).unwrap_or_default()
        ),
    }
}

fn profile_line(profile: &Profile) -> String {
    let mut line = format!(
        "{}  FID: {}",
        format!("@{}", profile.user.handle).bold(),
        profile.user.id
    );
    if let Some(name) = &profile.user.display_name {
        line.push_str(&format!("  ({})", name));
    }
    if let (Some(followers), Some(following)) = (profile.follower_count, profile.following_count) {
        line.push_str(&format!(
            "  reported {} followers / {} following",
            followers, following
        ));
    }
    line
}

/// Prints the failure banner; returns whether the run failed.
pub fn failure(run: &AnalysisRun) -> bool {
    if let RunState::Failed { message, .. } = run.state() {
        println!();
        println!("{}", "Connection Error".red().bold());
        println!("{}", message);
        return true;
    }
    false
}

pub fn dashboard(run: &AnalysisRun) {
    let result = run.result();
    let composition = result.composition();

    println!();
    println!(
        "{:<12}{:>8}",
        "Following".dimmed(),
        result.total_following.to_string().bold()
    );
    println!(
        "{:<12}{:>8}",
        "Followers".dimmed(),
        result.total_followers.to_string().bold()
    );
    let ratio = format!("{:.2}x", result.ratio);
    let ratio = if result.ratio > 1.0 {
        ratio.green()
    } else {
        ratio.yellow()
    };
    println!("{:<12}{:>8}  followers per following", "Ratio".dimmed(), ratio);
    println!(
        "{:<12}{:>8}  follow each other",
        "Mutuals".dimmed(),
        result.mutual.len().to_string().blue()
    );

    println!();
    println!("{}", "Network Composition".bold());
    composition_bars(result.total_followers, result.total_following, result.mutual.len(), &composition);

    println!();
    println!("{}", "Newest Followers".green().bold());
    if result.recent_followers.is_empty() {
        println!("{}", "No recent data available.".dimmed());
    }
    for user in &result.recent_followers {
        println!(
            "  @{:<24} FID: {:<10} {}",
            user.handle,
            user.id,
            "NEW".green()
        );
    }

    for collection in [run.following(), run.followers()].into_iter().flatten() {
        if !collection.status().is_complete() {
            println!();
            println!(
                "{} {} list is partial ({} users from {} pages): {:?}",
                "warning:".yellow().bold(),
                collection.direction,
                collection.len(),
                collection.pages(),
                collection.status()
            );
        }
    }
}

fn composition_bars(
    followers: usize,
    following: usize,
    mutual: usize,
    composition: &NetworkComposition,
) {
    const WIDTH: usize = 40;
    let filled = (composition.followers_share / 100.0 * WIDTH as f64).round() as usize;
    println!(
        "  Followers ({}) {}{} Following ({})",
        followers,
        "█".repeat(filled).magenta(),
        "█".repeat(WIDTH - filled.min(WIDTH)).dimmed(),
        following
    );
    let filled = (composition.mutual_share / 100.0 * WIDTH as f64).round() as usize;
    println!(
        "  Mutual ({})    {}{} One-Sided ({})",
        mutual,
        "█".repeat(filled).blue(),
        "█".repeat(WIDTH - filled.min(WIDTH)).dimmed(),
        composition.one_sided
    );
}

pub fn list(run: &AnalysisRun, tab: ListTab, as_table: bool) {
    let records = tab.records(run);
    println!();
    println!("{} ({})", tab.title().bold(), records.len());

    if records.is_empty() {
        println!("{}", "List is empty.".dimmed());
        return;
    }

    if as_table {
        let rows: Vec<UserRow> = records.iter().map(UserRow::from).collect();
        println!("{}", Table::new(rows));
        return;
    }

    for user in records {
        let bio = truncate(user.bio.as_deref().unwrap_or(""), 60);
        println!(
            "  {:<26} {}  [{}: {}]",
            format!("@{}", user.handle).bold(),
            bio.dimmed(),
            tab.action(),
            user.profile_url()
        );
    }
}

pub fn logs(entries: &[LogEntry]) {
    println!();
    println!("{}", "Debug Console".dimmed());
    for entry in entries {
        match entry.level {
            LogLevel::Info => println!("{}", entry.to_string().green()),
            LogLevel::Error => println!("{}", entry.to_string().red().bold()),
        }
    }
}

#[derive(Serialize)]
pub struct JsonReport<'a> {
    pub run: &'a AnalysisRun,
    pub composition: NetworkComposition,
    pub logs: Vec<LogEntry>,
}

pub fn json(run: &AnalysisRun, logs: Vec<LogEntry>) -> anyhow::Result<()> {
    let report = JsonReport {
        run,
        composition: run.result().composition(),
        logs,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_keeps_first_line_and_limits_width() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("line one\nline two", 20), "line one");
        assert_eq!(truncate("abcdefghijkl", 8), "abcde...");
    }

    #[test]
    fn row_uses_profile_link() {
        let row = UserRow::from(&UserRecord::new(7, "x").with_bio("gm"));
        assert_eq!(row.handle, "@x");
        assert_eq!(row.link, "https://warpcast.com/x");
        assert_eq!(row.bio, "gm");
    }
}
