//! REPL – Read-Eval-Print Loop for the Keepsake interactive shell.
//!
//! Supported slash-commands:
//!   /help                     – show this list
//!   /add <file>...            – add photos/videos as a new memory
//!   /list [all|photos|videos] – browse the gallery
//!   /show <id>                – show one memory in full
//!   /search                   – search by text, category and date
//!   /edit <id>                – change a memory's title, description, category or date
//!   /delete <id>              – delete a memory (asks first)
//!   /export [category|all]    – write a JSON bundle
//!   /import <file>            – preview and import a JSON bundle
//!   /save-media <id> <path>   – write a memory's photo/video back to disk
//!   /categories               – count memories per category
//!   /settings                 – edit `~/.keepsake/config.toml`
//!   /quit | /exit             – save and exit

use chrono::{NaiveDate, Utc};
use colored::Colorize;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::runtime::Runtime;

use keepsake_store::bundle::{self, ImportPreview};
use keepsake_store::media::{self, UploadCandidate};
use keepsake_store::store::{MemoryStore, SearchQuery};
use keepsake_types::display::{description_or_placeholder, format_date, format_file_size, result_summary};
use keepsake_types::{Category, CategoryFilter, KindFilter, MemoryDraft, MemoryEdit, MemoryId, MemoryRecord};

use crate::config::{self, Config};

/// Entry point for the interactive REPL. Returns on `/quit` or EOF.
pub fn run(store: Arc<Mutex<MemoryStore>>, mut cfg: Config, rt: &Runtime) {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("{} ", "keepsake>".bold().cyan());
        stdout.flush().ok();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break, // EOF
            Ok(_) => {}
            Err(e) => {
                eprintln!("{}: {}", "Read error".red(), e);
                break;
            }
        }

        let mut words = line.split_whitespace();
        let Some(cmd) = words.next() else {
            continue;
        };
        let args: Vec<&str> = words.collect();

        match cmd {
            "/help" => cmd_help(),
            "/add" => cmd_add(&store, &cfg, rt, &args),
            "/list" => cmd_list(&store, &args),
            "/show" => cmd_show(&store, &args),
            "/search" => cmd_search(&store),
            "/edit" => cmd_edit(&store, &args),
            "/delete" => cmd_delete(&store, &args),
            "/export" => cmd_export(&store, &cfg, rt, &args),
            "/import" => cmd_import(&store, rt, &args),
            "/save-media" => cmd_save_media(&store, rt, &args),
            "/categories" => cmd_categories(&store),
            "/settings" => cmd_settings(&mut cfg),
            "/quit" | "/exit" => {
                println!("{}", "Goodbye.".green());
                break;
            }
            other => {
                println!(
                    "{} '{}'. Type {} for available commands.",
                    "Unknown command:".red(),
                    other.yellow(),
                    "/help".bold()
                );
            }
        }

        report_warnings(&mut lock(&store));
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Command handlers
// ─────────────────────────────────────────────────────────────────────────────

fn cmd_help() {
    println!();
    println!("{}", "Keepsake Commands".bold().underline());
    println!("  {}  – add photos/videos as a new memory", "/add <file>...".bold().cyan());
    println!("  {}  – browse the gallery", "/list [all|photos|videos]".bold().cyan());
    println!("  {}  – show one memory", "/show <id>".bold().cyan());
    println!("  {}  – search by text, category and date", "/search".bold().cyan());
    println!("  {}  – edit a memory", "/edit <id>".bold().cyan());
    println!("  {}  – delete a memory", "/delete <id>".bold().cyan());
    println!("  {}  – export a JSON bundle", "/export [category|all]".bold().cyan());
    println!("  {}  – import a JSON bundle", "/import <file>".bold().cyan());
    println!("  {}  – save a memory's media to disk", "/save-media <id> <path>".bold().cyan());
    println!("  {}  – memories per category", "/categories".bold().cyan());
    println!("  {}  – edit ~/.keepsake/config.toml", "/settings".bold().cyan());
    println!("  {}  – save and exit", "/quit  /exit".bold().cyan());
    println!();
}

fn cmd_add(store: &Arc<Mutex<MemoryStore>>, cfg: &Config, rt: &Runtime, args: &[&str]) {
    if args.is_empty() {
        println!("  Usage: /add <file> [file ...]");
        return;
    }

    let mut candidates = Vec::new();
    for path in args {
        match rt.block_on(UploadCandidate::from_path(path)) {
            Ok(c) => candidates.push(c),
            Err(e) => println!("  {} {}: {}", "Skipping".yellow(), path, e),
        }
    }
    let files = match media::select_supported(candidates) {
        Ok(files) => files,
        Err(_) => {
            println!("{}", "Please select valid image or video files.".red());
            return;
        }
    };

    println!("{}", "New Memory".bold().underline());
    for f in &files {
        let badge = f.kind().map(|k| k.badge()).unwrap_or("•");
        println!("  {} {} ({})", badge, f.name.bold(), format_file_size(f.size).dimmed());
    }

    let default_category = cfg.category();
    let draft = MemoryDraft {
        title: prompt_str("  Title: ", ""),
        description: prompt_str("  Description []: ", ""),
        category: Category::from(
            prompt_str(&format!("  Category [{default_category}]: "), default_category.as_str())
                .as_str(),
        ),
        date: prompt_date(&format!("  Date [{}]: ", Utc::now().date_naive()), None),
    };
    if let Err(e) = draft.validate() {
        println!("{}", format!("{e}.").red());
        return;
    }

    println!("  Saving memory …");
    let mut embedded = Vec::with_capacity(files.len());
    for f in files {
        let name = f.name.clone();
        match rt.block_on(media::embed(f)) {
            Ok(file) => embedded.push(file),
            Err(e) => {
                tracing::error!(file = %name, error = %e, "embedding failed");
                println!("{}", "Error saving memory. Please try again.".red());
                return;
            }
        }
    }

    match draft.into_records(embedded, Utc::now()) {
        Ok(records) => {
            let ids = lock(store).add_all(records);
            println!("{} ({} file(s))", "✓ Memory saved successfully!".green(), ids.len());
        }
        Err(e) => println!("{}", format!("{e}.").red()),
    }
}

fn cmd_list(store: &Arc<Mutex<MemoryStore>>, args: &[&str]) {
    let mut guard = lock(store);
    if let Some(raw) = args.first() {
        match raw.parse::<KindFilter>() {
            Ok(filter) => guard.set_kind_filter(filter),
            Err(e) => {
                println!("{}", e.red());
                return;
            }
        }
    }

    let filter = guard.filter_context().kind;
    let visible: Vec<&MemoryRecord> = guard.visible().collect();
    println!("{} ({})", "Gallery".bold().underline(), filter.to_string().dimmed());
    if visible.is_empty() {
        println!("  No memories yet. Add some with {}", "/add <file>".bold());
        return;
    }
    for record in visible {
        print_card(record);
    }
}

fn cmd_show(store: &Arc<Mutex<MemoryStore>>, args: &[&str]) {
    let Some(id) = parse_id(args.first()) else {
        println!("  Usage: /show <id>");
        return;
    };
    let guard = lock(store);
    match guard.get(id) {
        Some(record) => print_detail(record),
        None => println!("{} {}", "Memory not found:".red(), id),
    }
}

fn cmd_search(store: &Arc<Mutex<MemoryStore>>) {
    let text = prompt_str("  Search text (blank for any): ", "");
    let category_raw = prompt_str("  Category (blank for any): ", "");
    let date = prompt_date("  Date YYYY-MM-DD (blank for any): ", None);
    let query = search_query(&text, &category_raw, date);

    let mut guard = lock(store);
    guard.set_query(query.text);
    guard.set_category_filter(query.category);
    guard.set_date_filter(query.date);

    let unconstrained = guard.filter_context().search.is_unconstrained();
    let results = guard.search_active();
    if results.is_empty() {
        println!("  {}", "No memories found".bold());
        println!("  Try adjusting your search criteria or add some memories first!");
        return;
    }
    if unconstrained {
        println!("  {}", "No filters set, showing every memory.".dimmed());
    }
    println!("  {}", result_summary(results.len()).bold());
    for record in results {
        print_card(record);
    }
}

fn cmd_edit(store: &Arc<Mutex<MemoryStore>>, args: &[&str]) {
    let Some(id) = parse_id(args.first()) else {
        println!("  Usage: /edit <id>");
        return;
    };
    let Some(original) = lock(store).get(id).cloned() else {
        println!("{} {}", "Memory not found:".red(), id);
        return;
    };

    println!("{}", "Edit Memory (press Enter to keep a value)".bold().underline());
    let title = prompt_str(&format!("  Title [{}]: ", original.title), &original.title);
    let description = kept_or_cleared(
        &prompt_str(
            &format!("  Description [{}] ('{CLEAR}' to clear): ", original.description),
            "",
        ),
        &original.description,
    );
    let category = prompt_str(
        &format!("  Category [{}]: ", original.category),
        original.category.as_str(),
    );
    let date = prompt_date(&format!("  Date [{}]: ", original.date), Some(original.date));

    let edit = MemoryEdit {
        title: Some(title),
        description: Some(description),
        category: Some(Category::from(category.as_str())),
        date,
    };
    match lock(store).replace(id, &edit) {
        Ok(new_id) => println!("{} (now #{})", "✓ Memory updated.".green(), new_id),
        Err(e) => println!("{} {}", "Memory not changed:".red(), e),
    }
}

fn cmd_delete(store: &Arc<Mutex<MemoryStore>>, args: &[&str]) {
    let Some(id) = parse_id(args.first()) else {
        println!("  Usage: /delete <id>");
        return;
    };
    let Some(record) = lock(store).get(id).cloned() else {
        println!("{} {}", "Memory not found:".red(), id);
        return;
    };
    print_card(&record);
    if !confirm("  Delete this memory? This cannot be undone. [y/N]: ") {
        println!("  Kept.");
        return;
    }
    if lock(store).remove(id) {
        println!("{}", "✓ Memory deleted successfully!".green());
    }
}

fn cmd_export(store: &Arc<Mutex<MemoryStore>>, cfg: &Config, rt: &Runtime, args: &[&str]) {
    let scope = CategoryFilter::from(args.first().copied().unwrap_or("all"));
    let bundle = lock(store).export_subset(&scope);

    if bundle.memories.is_empty() {
        match &scope {
            CategoryFilter::All => println!("{}", "No memories to export.".red()),
            CategoryFilter::Only(c) => {
                println!("{}", format!("No memories found in the \"{c}\" category.").red())
            }
        }
        return;
    }

    let path = Path::new(&cfg.export_dir).join(bundle::export_file_name(&scope));
    match rt.block_on(bundle::write_bundle(&path, &bundle)) {
        Ok(()) => println!(
            "{} {} memor{} → {}",
            "✓ Exported".green(),
            bundle.memories.len(),
            if bundle.memories.len() == 1 { "y" } else { "ies" },
            path.display().to_string().bold()
        ),
        Err(e) => println!("{} {}", "Export failed:".red(), e),
    }
}

fn cmd_import(store: &Arc<Mutex<MemoryStore>>, rt: &Runtime, args: &[&str]) {
    let Some(path) = args.first() else {
        println!("  Usage: /import <file.json>");
        return;
    };
    let preview = match rt
        .block_on(bundle::read_import_file(path))
        .and_then(|text| bundle::preview_import(&text))
    {
        Ok(p) => p,
        Err(e) => {
            tracing::error!(path = %path, error = %e, "import file unreadable");
            println!(
                "{} ({e})",
                "Error reading the file. Please make sure it's a valid Keepsake export file.".red()
            );
            return;
        }
    };

    if preview.is_empty() {
        println!("{}", "No valid memories found in the file.".red());
        return;
    }
    print_import_preview(&preview);

    if !confirm("  Import these memories? [y/N]: ") {
        println!("  Import cancelled.");
        return;
    }
    match lock(store).import_bundle(preview.candidates) {
        Ok(report) => println!(
            "{}",
            format!("✓ Successfully imported {} memories!", report.accepted).green()
        ),
        Err(e) => println!("{} {}", "Import failed:".red(), e),
    }
}

fn cmd_save_media(store: &Arc<Mutex<MemoryStore>>, rt: &Runtime, args: &[&str]) {
    let (Some(id), Some(dest)) = (parse_id(args.first()), args.get(1)) else {
        println!("  Usage: /save-media <id> <path>");
        return;
    };
    let Some(record) = lock(store).get(id).cloned() else {
        println!("{} {}", "Memory not found:".red(), id);
        return;
    };
    let mut dest = PathBuf::from(dest);
    if dest.is_dir() {
        dest = dest.join(&record.file_name);
    }
    match rt.block_on(media::extract_to(&record.media, &dest)) {
        Ok(bytes) => println!(
            "{} {} ({})",
            "✓ Saved".green(),
            dest.display().to_string().bold(),
            format_file_size(bytes)
        ),
        Err(e) => println!("{} {}", "Could not save media:".red(), e),
    }
}

fn cmd_categories(store: &Arc<Mutex<MemoryStore>>) {
    let guard = lock(store);
    println!("{}", "Categories".bold().underline());
    for (category, count) in guard.category_counts() {
        println!("  {:<12} {}", category.label(), count.to_string().yellow());
    }
}

fn cmd_settings(cfg: &mut Config) {
    println!("{}", "Settings Editor".bold().underline());
    println!("  (changes to the journal database or slot apply on next start)");
    let mut next = cfg.clone();
    next.storage_path = prompt_str(&format!("  Journal database [{}]: ", next.storage_path), &next.storage_path);
    next.storage_slot = prompt_str(&format!("  Storage slot     [{}]: ", next.storage_slot), &next.storage_slot);
    next.default_category = prompt_str(
        &format!("  Default category [{}]: ", next.default_category),
        &next.default_category,
    );
    next.export_dir = prompt_str(&format!("  Export directory [{}]: ", next.export_dir), &next.export_dir);

    match config::save(&next) {
        Ok(()) => {
            *cfg = next;
            println!(
                "{} {}",
                "✓ Settings saved to".green(),
                config::config_path().display().to_string().bold()
            );
        }
        Err(e) => println!("{}: {}", "Error saving config".red(), e),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Rendering
// ─────────────────────────────────────────────────────────────────────────────

fn print_card(record: &MemoryRecord) {
    println!(
        "  {} {} {}  {} · {}",
        format!("#{}", record.id).dimmed(),
        record.kind.badge(),
        record.title.bold(),
        record.category.as_str().cyan(),
        format_date(record.date)
    );
    println!("      {}", description_or_placeholder(&record.description).dimmed());
}

fn print_detail(record: &MemoryRecord) {
    println!();
    println!("  {} {}", record.kind.badge(), record.title.bold().underline());
    println!("  {}", description_or_placeholder(&record.description));
    println!("  Category: {}", record.category.label());
    println!("  Date:     {}", format_date(record.date));
    println!("  Type:     {}", record.kind);
    println!(
        "  File:     {} ({}, {})",
        record.file_name,
        record.mime_type,
        format_file_size(record.size_bytes)
    );
    println!("  Added:    {}", record.created_at.format("%Y-%m-%d %H:%M UTC"));
    println!("  Id:       {}", record.id);
    println!();
}

fn print_import_preview(preview: &ImportPreview) {
    println!("{}", format!("Found {} memories to import.", preview.accepted.len()).green());
    for record in &preview.accepted {
        println!(
            "  {} {}  {} · {}",
            record.kind.badge(),
            record.title.bold(),
            record.category.as_str().cyan(),
            format_date(record.date)
        );
    }
    if preview.rejected + preview.unreadable > 0 {
        println!(
            "  {}",
            format!("{} entr(ies) will be skipped as invalid.", preview.rejected + preview.unreadable).yellow()
        );
    }
}

fn report_warnings(store: &mut MemoryStore) {
    for w in store.drain_warnings() {
        println!("{} {}", "Error saving memories:".red(), w);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn lock(store: &Arc<Mutex<MemoryStore>>) -> MutexGuard<'_, MemoryStore> {
    store.lock().unwrap_or_else(|p| p.into_inner())
}

fn parse_id(raw: Option<&&str>) -> Option<MemoryId> {
    raw.and_then(|s| s.trim_start_matches('#').parse::<MemoryId>().ok())
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

/// Prompt for a `YYYY-MM-DD` date. Returns `default` on Enter or bad input.
fn prompt_date(msg: &str, default: Option<NaiveDate>) -> Option<NaiveDate> {
    let raw = prompt_str(msg, "");
    if raw.is_empty() {
        return default;
    }
    match parse_date(&raw) {
        Some(d) => Some(d),
        None => {
            println!("  {} '{}' is not a YYYY-MM-DD date, ignoring it", "Warning:".yellow(), raw);
            default
        }
    }
}

/// Answer that empties an optional field during `/edit`.
const CLEAR: &str = "-";

/// Blank keeps `original`, [`CLEAR`] empties the field, anything else
/// replaces it.
fn kept_or_cleared(answer: &str, original: &str) -> String {
    match answer.trim() {
        "" => original.to_string(),
        CLEAR => String::new(),
        other => other.to_string(),
    }
}

/// Build a search from the `/search` answers. Blank answers leave that
/// dimension unconstrained.
fn search_query(text: &str, category: &str, date: Option<NaiveDate>) -> SearchQuery {
    let category = category.trim();
    SearchQuery {
        text: text.trim().to_string(),
        category: (!category.is_empty()).then(|| Category::from(category)),
        date,
    }
}

fn confirm(msg: &str) -> bool {
    matches!(prompt_str(msg, "n").to_lowercase().as_str(), "y" | "yes")
}

/// Prompt for a string value.  Returns `default` when the user presses Enter.
pub fn prompt_str(msg: &str, default: &str) -> String {
    print!("{}", msg);
    io::stdout().flush().ok();

    let mut line = String::new();
    match io::stdin().lock().read_line(&mut line) {
        Ok(_) => {
            let trimmed = line.trim().to_string();
            if trimmed.is_empty() {
                default.to_string()
            } else {
                trimmed
            }
        }
        Err(_) => default.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_id_accepts_hash_prefix() {
        assert_eq!(parse_id(Some(&"#42")), Some(MemoryId(42)));
        assert_eq!(parse_id(Some(&"42")), Some(MemoryId(42)));
        assert_eq!(parse_id(Some(&"abc")), None);
        assert_eq!(parse_id(None), None);
    }

    #[test]
    fn blank_search_answers_clear_every_constraint() {
        let query = search_query("", "  ", None);
        assert!(query.is_unconstrained());
        assert_eq!(query, SearchQuery::default());
    }

    #[test]
    fn search_answers_become_constraints() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 1);
        let query = search_query(" trip ", "travel", date);
        assert_eq!(query.text, "trip");
        assert_eq!(query.category, Some(Category::Travel));
        assert_eq!(query.date, date);
        assert!(!query.is_unconstrained());
    }

    #[test]
    fn edit_answer_keeps_clears_or_replaces() {
        assert_eq!(kept_or_cleared("", "Pizza night"), "Pizza night");
        assert_eq!(kept_or_cleared("   ", "Pizza night"), "Pizza night");
        assert_eq!(kept_or_cleared("-", "Pizza night"), "");
        assert_eq!(kept_or_cleared(" Movie night ", "Pizza night"), "Movie night");
    }

    #[test]
    fn parse_date_requires_iso_format() {
        assert_eq!(parse_date("2024-05-10"), NaiveDate::from_ymd_opt(2024, 5, 10));
        assert_eq!(parse_date(" 2024-05-10 "), NaiveDate::from_ymd_opt(2024, 5, 10));
        assert_eq!(parse_date("10/05/2024"), None);
    }
}
