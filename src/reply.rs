use regex::Regex;

/// `On Mon, Oct 5, 2015 at 10:00 AM, PIF <...> wrote:` and the other quoted-reply headers mail
/// clients write, for any date and time. Only a whole header line counts, so a bullet that
/// happens to start with a date is kept.
const QUOTED_HEADER: &str = r"(?m)^[ \t]*On (?:(?:Mon|Tue|Wed|Thu|Fri|Sat|Sun), )?(?:Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec) \d{1,2}, \d{4},? (?:at )?\d{1,2}:\d{2}[ \x{202F}\x{A0}]?(?:AM|PM)(?:,|.*wrote:|[ \t\r]*$)";

const BULLET: char = '*';

#[derive(Debug, Clone)]
enum Marker {
    Literal(String),
    Pattern(Regex),
}

impl Marker {
    fn find(&self, text: &str) -> Option<usize> {
        match self {
            Marker::Literal(s) => text.find(s.as_str()),
            Marker::Pattern(re) => re.find(text).map(|m| m.start()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReplyCleaner {
    markers: Vec<Marker>,
}

impl ReplyCleaner {
    pub fn new(appname: &str) -> ReplyCleaner {
        let literal = |s: &str| Marker::Literal(s.to_string());
        let quoted_header = Regex::new(QUOTED_HEADER).expect("quoted header pattern compiles");

        ReplyCleaner {
            markers: vec![
                literal("[DONE]"),
                literal("[done]"),
                literal("[Done]"),
                literal("-----Original Message-----"),
                literal("________________________________________"),
                Marker::Literal(format!("From: {}", appname)),
                literal("Sent from my iPhone"),
                Marker::Pattern(quoted_header),
                literal("Just reply with a few brief bullets starting with"),
            ],
        }
    }

    pub fn strip_boilerplate<'a>(&self, body: &'a str) -> &'a str {
        let mut text = body;
        for marker in &self.markers {
            if let Some(pos) = marker.find(text) {
                text = &text[..pos];
            }
        }
        text.trim()
    }

    /// One `* ` bullet per point, newline separated. Nothing left means an empty string.
    pub fn clean(&self, body: &str) -> String {
        let points: Vec<&str> = self
            .strip_boilerplate(body)
            .split(BULLET)
            .map(|s| s.trim_matches(|c: char| matches!(c, '[' | ']' | '\n' | '\r' | ' ')))
            .filter(|s| !s.is_empty() && *s != "*")
            .collect();

        if points.is_empty() {
            return String::new();
        }
        format!("* {}", points.join("\n* "))
    }
}
