use crate::types::{CaptionRecord, Video};

const SIZE_UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];

/// Format a byte count with 1024-based units, at most two decimals
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = format!("{value:.2}");
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, SIZE_UNITS[unit])
}

/// Format seconds as M:SS, or "Unknown" when the backend could not probe it
pub fn format_clip_duration(seconds: Option<f64>) -> String {
    match seconds {
        Some(seconds) if seconds > 0.0 && seconds.is_finite() => {
            let mins = (seconds / 60.0) as u64;
            let secs = (seconds % 60.0) as u64;
            format!("{}:{:02}", mins, secs)
        }
        _ => "Unknown".to_string(),
    }
}

pub fn format_processing_time(seconds: f64) -> String {
    format!("{seconds:.1}s")
}

/// First `max_chars` characters of `text` on a single line, with an ellipsis
/// when cut.
pub fn caption_preview(text: &str, max_chars: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let cut: String = flat.chars().take(max_chars).collect();
    format!("{}…", cut.trim_end())
}

/// One line per video for list output
pub fn format_video_line(video: &Video) -> String {
    let status = if video.has_caption {
        "captioned"
    } else {
        "no caption"
    };
    let mut line = format!(
        "{}  {}  {}  [{}]",
        video.filename,
        format_file_size(video.size),
        format_clip_duration(video.duration),
        status
    );
    let models = video.models();
    if !models.is_empty() {
        line.push_str(&format!("  models: {}", models.join(", ")));
    }
    line
}

pub fn format_caption_record(record: &CaptionRecord, display_name: &str) -> String {
    let mut output = String::new();
    output.push_str(&format!("## {} ({})\n", display_name, record.model_key));
    output.push_str(&format!(
        "Generated: {} | Processing: {}\n",
        record.generated_at.format("%Y-%m-%d %H:%M:%S UTC"),
        format_processing_time(record.processing_time_seconds)
    ));
    if let Some(prompt) = record.prompt.as_deref().filter(|p| !p.is_empty()) {
        output.push_str(&format!("Prompt: {}\n", caption_preview(prompt, 80)));
    }
    output.push('\n');
    output.push_str(record.caption.trim());
    output.push('\n');
    output
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    #[test]
    fn file_sizes_use_binary_units() {
        assert_eq!(format_file_size(0), "0 Bytes");
        assert_eq!(format_file_size(500), "500 Bytes");
        assert_eq!(format_file_size(1024), "1 KB");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(5 * 1024 * 1024), "5 MB");
        assert_eq!(format_file_size(3 * 1024 * 1024 * 1024 * 1024), "3072 GB");
    }

    #[test]
    fn durations() {
        assert_eq!(format_clip_duration(Some(75.9)), "1:15");
        assert_eq!(format_clip_duration(Some(5.0)), "0:05");
        assert_eq!(format_clip_duration(None), "Unknown");
        assert_eq!(format_clip_duration(Some(0.0)), "Unknown");
    }

    #[test]
    fn processing_time_has_one_decimal() {
        assert_eq!(format_processing_time(12.345), "12.3s");
    }

    #[test]
    fn preview_flattens_and_truncates() {
        assert_eq!(caption_preview("a  short\ncaption", 40), "a short caption");
        assert_eq!(caption_preview("abcdef ghij", 6), "abcdef…");
    }

    #[test]
    fn record_block_includes_prompt_and_caption() {
        let record = CaptionRecord {
            filename: "clip1.mp4".into(),
            model_key: "qwen2vl".into(),
            caption: "A dog runs on the beach.\n".into(),
            prompt: Some("Describe the video.".into()),
            generated_at: Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap(),
            processing_time_seconds: 4.26,
            model_name: None,
            model_version: None,
            model_display_name: None,
        };

        let block = format_caption_record(&record, "Qwen2-VL-7B");
        assert!(block.starts_with("## Qwen2-VL-7B (qwen2vl)\n"));
        assert!(block.contains("Processing: 4.3s"));
        assert!(block.contains("Prompt: Describe the video."));
        assert!(block.ends_with("A dog runs on the beach.\n"));
    }
}
