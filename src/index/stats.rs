use crate::index::build::open_index;
use crate::utils::{find_source_root, list_indexed_roots, AppConfig, IndexMeta};
use anyhow::Result;
use std::path::Path;
use std::time::{Duration, UNIX_EPOCH};

/// Display index statistics
pub fn show_stats(root_path: &Path, config: &AppConfig) -> Result<()> {
    let root = find_source_root(root_path)?;
    let index = open_index(&root, config)?;
    let stats = index.stats()?;
    let meta = IndexMeta::load(&root)?;

    println!("Index Statistics");
    println!("================");
    println!();
    println!("Root path:        {}", root.display());
    println!("Index file:       {}", stats.path.display());
    println!("Format version:   {}", stats.version);
    println!("Documents:        {}", stats.documents);
    println!("Terms:            {}", stats.words);
    println!("Include entries:  {}", stats.includes);
    println!("Index size:       {}", format_size(stats.size_bytes));

    if let Some(meta) = meta {
        println!();
        println!("Created:          {}", format_timestamp(meta.created_at));
        println!("Updated:          {}", format_timestamp(meta.updated_at));
    }

    Ok(())
}

/// List all indexed source roots
pub fn list_indexes() -> Result<()> {
    let roots = list_indexed_roots()?;

    if roots.is_empty() {
        println!("No indexed source trees found.");
        return Ok(());
    }

    println!("Indexed Source Trees");
    println!("====================");
    println!();

    for location in roots {
        let status = if location.root_path.exists() { "" } else { " [missing]" };
        println!("  {}{}", location.root_path.display(), status);
        println!("    Index: {}", location.index_dir.display());
        println!();
    }

    Ok(())
}

/// Format byte size to human readable
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

fn format_timestamp(ts: u64) -> String {
    format!("{:?}", UNIX_EPOCH + Duration::from_secs(ts))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(40), "40 bytes");
        assert_eq!(format_size(2048), "2.00 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.00 MB");
    }
}
