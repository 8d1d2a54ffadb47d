/// Flatten SRT subtitles into a single line of text.
///
/// Sequence numbers and `-->` time ranges are dropped, remaining lines are trimmed
/// and joined with single spaces.
pub fn flatten_srt(body: &str) -> String {
    let body = body.trim_start_matches('\u{feff}');

    body.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| !is_timecode(line) && !is_sequence_number(line))
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_timecode(line: &str) -> bool {
    line.contains("-->")
}

fn is_sequence_number(line: &str) -> bool {
    !line.is_empty() && line.chars().all(|c| c.is_ascii_digit())
}
