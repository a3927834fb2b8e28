use regex::Regex;

/// Picks media titles out of mpv's verbose log output.
pub struct TitleScanner {
    marker: Regex,
}

impl TitleScanner {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            marker: Regex::new(r#"^\sicy-title:\s|^Title:\s|^\[cplayer\].*/force-media-title="#)?,
        })
    }

    /// The title announced on `line`, if it announces one.
    ///
    /// `[file] Opening <path>` yields the last path segment; ICY, tag and
    /// forced titles yield what follows the marker.
    pub fn extract(&self, line: &str) -> Option<String> {
        let title = if let Some((_, opened)) = line.split_once("[file] Opening ") {
            opened.rsplit('/').next().unwrap_or(opened).trim().to_string()
        } else if self.marker.is_match(line) {
            let stripped = self.marker.replace_all(line, "");
            let rest: &str = &stripped;
            let rest = rest.strip_suffix(" -> 1").unwrap_or(rest);
            rest.trim_matches('"').to_string()
        } else {
            return None;
        };
        (!title.is_empty()).then_some(title)
    }
}
