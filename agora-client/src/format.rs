use crate::api::Time;

/// Score as displayed next to the vote arrows
pub fn format_votes(votes: i64) -> String {
    match votes >= 1000 {
        true => format!("{:.1}k", votes as f64 / 1000.0),
        false => votes.to_string(),
    }
}

pub fn time_ago(then: Time, now: Time) -> String {
    let secs = now.signed_duration_since(then).num_seconds();
    match secs {
        s if s < 60 => String::from("just now"),
        s if s < 3600 => format!("{}m ago", s / 60),
        s if s < 86400 => format!("{}h ago", s / 3600),
        s => format!("{}d ago", s / 86400),
    }
}
