use std::fmt;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Route {
    /// Login page, or the forum for signed-in users
    Home,
    Forum,
    /// Profile of the user with this display name
    Profile(String),
    /// Topic page, by topic id or slug
    Topic(String),
}

impl Route {
    pub fn parse(path: &str) -> Option<Route> {
        let path = path.split(['?', '#']).next().unwrap_or("");
        let segments = path
            .split('/')
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>();
        match &segments as &[&str] {
            [] => Some(Route::Home),
            ["forum"] => Some(Route::Forum),
            ["u", name] => Some(Route::Profile(percent_decode(name)?)),
            ["topic", id] => Some(Route::Topic(percent_decode(id)?)),
            _ => None,
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::Home => f.write_str("/"),
            Route::Forum => f.write_str("/forum"),
            Route::Profile(name) => write!(f, "/u/{}", percent_encode(name)),
            Route::Topic(id) => write!(f, "/topic/{}", percent_encode(id)),
        }
    }
}

fn percent_encode(s: &str) -> String {
    let mut res = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                res.push(char::from(b))
            }
            _ => res.push_str(&format!("%{b:02X}")),
        }
    }
    res
}

fn percent_decode(s: &str) -> Option<String> {
    let mut bytes = Vec::with_capacity(s.len());
    let mut it = s.bytes();
    while let Some(b) = it.next() {
        if b == b'%' {
            let hex = [it.next()?, it.next()?];
            let hex = std::str::from_utf8(&hex).ok()?;
            bytes.push(u8::from_str_radix(hex, 16).ok()?);
        } else {
            bytes.push(b);
        }
    }
    String::from_utf8(bytes).ok()
}
