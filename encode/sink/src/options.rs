/*!
    `key=value` option strings for containers and encoders.

    User options are checked against the options the backend knows before
    they are stored in a [`Dictionary`]. The backend consumes the entries it understands when
    opening an encoder or writing the header; anything left over is reported.
*/

use std::fmt;

use tracing::{debug, error};

/**
    Value type of a known option.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OptionKind {
    Int,
    Float,
    Rational,
    Bool,
    String,
    /// Flag set; values are `+name`/`-name` lists of the given names.
    Flags(&'static [&'static str]),
    /// Flag set whose names only the library can check.
    LibraryFlags,
}

impl OptionKind {
    pub fn is_flags(self) -> bool {
        matches!(self, Self::Flags(_) | Self::LibraryFlags)
    }
}

/**
    A named option with its value type.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OptionSpec {
    pub name: &'static str,
    pub kind: OptionKind,
}

impl OptionSpec {
    pub const fn new(name: &'static str, kind: OptionKind) -> Self {
        Self { name, kind }
    }
}

/**
    A table of options understood by a container or an encoder.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OptionTable {
    pub name: &'static str,
    pub options: &'static [OptionSpec],
}

impl OptionTable {
    pub const EMPTY: OptionTable = OptionTable {
        name: "none",
        options: &[],
    };

    pub fn find(&self, key: &str) -> Option<&OptionSpec> {
        self.options.iter().find(|spec| spec.name == key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.find(key).is_some()
    }
}

const CODEC_FLAGS: &[&str] = &[
    "qscale",
    "global_header",
    "pass1",
    "pass2",
    "gray",
    "psnr",
    "low_delay",
    "cgop",
];

/**
    Options every encoder understands.
*/
pub const CODEC_OPTIONS: OptionTable = OptionTable {
    name: "codec",
    options: &[
        OptionSpec::new("b", OptionKind::Int),
        OptionSpec::new("g", OptionKind::Int),
        OptionSpec::new("bf", OptionKind::Int),
        OptionSpec::new("qmin", OptionKind::Int),
        OptionSpec::new("qmax", OptionKind::Int),
        OptionSpec::new("global_quality", OptionKind::Int),
        OptionSpec::new("threads", OptionKind::Int),
        OptionSpec::new("maxrate", OptionKind::Int),
        OptionSpec::new("bufsize", OptionKind::Int),
        OptionSpec::new("time_base", OptionKind::Rational),
        OptionSpec::new("flags", OptionKind::Flags(CODEC_FLAGS)),
    ],
};

const FORMAT_FLAGS: &[&str] = &["genpts", "ignidx", "nofillin", "bitexact", "flush_packets"];

/**
    Options every container understands.
*/
pub const FORMAT_OPTIONS: OptionTable = OptionTable {
    name: "format",
    options: &[
        OptionSpec::new("packetsize", OptionKind::Int),
        OptionSpec::new("muxdelay", OptionKind::Float),
        OptionSpec::new("muxpreload", OptionKind::Float),
        OptionSpec::new("fflags", OptionKind::Flags(FORMAT_FLAGS)),
        OptionSpec::new("avoid_negative_ts", OptionKind::Int),
        OptionSpec::new("flush_packets", OptionKind::Bool),
    ],
};

/**
    Ordered key/value store for option strings.

    Setting a flags option to a value starting with `+` or `-` appends to
    the existing value instead of replacing it.
*/
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Dictionary {
    entries: Vec<(String, String)>,
}

impl Dictionary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /**
        Set `key` to `value`, or append `value` to the current value when
        `append` is true.
    */
    pub fn set(&mut self, key: &str, value: &str, append: bool) {
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some((_, current)) if append => current.push_str(value),
            Some((_, current)) => *current = value.to_string(),
            None => self.entries.push((key.to_string(), value.to_string())),
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        let idx = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(idx).1)
    }

    /**
        Remove every entry whose key `known` accepts, returning them in order.
    */
    pub fn take_known(&mut self, known: impl Fn(&str) -> bool) -> Vec<(String, String)> {
        let (taken, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.entries)
            .into_iter()
            .partition(|(k, _)| known(k));
        self.entries = kept;
        taken
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /**
        Log every remaining entry as not found, then clear the dictionary.
    */
    pub fn report_unconsumed(&mut self, scope: &str) {
        for (key, _) in self.entries.drain(..) {
            error!(scope, key = %key, "option not found");
        }
    }
}

/**
    Outcome of applying a single option string.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OptionStatus {
    Applied,
    NotFound,
    Malformed,
}

impl OptionStatus {
    pub fn is_applied(self) -> bool {
        self == Self::Applied
    }
}

impl fmt::Display for OptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Applied => "applied",
            Self::NotFound => "not found",
            Self::Malformed => "malformed",
        })
    }
}

/**
    Look `key` up in `tiers`, first match wins.
*/
pub fn find_in_tables(tiers: &[&OptionTable], key: &str) -> Option<OptionKind> {
    tiers.iter().find_map(|table| table.find(key)).map(|spec| spec.kind)
}

/**
    Apply `option` with the kinds listed in `tiers`.
*/
pub fn apply_option(dict: &mut Dictionary, option: &str, tiers: &[&OptionTable]) -> OptionStatus {
    apply_option_with(dict, option, |key| find_in_tables(tiers, key))
}

/**
    Parse `option` as `key=value`, look `key` up with `find` and store it
    in `dict`.

    An empty value removes the key. Nothing is stored unless the result is
    [`OptionStatus::Applied`].
*/
pub fn apply_option_with(
    dict: &mut Dictionary,
    option: &str,
    find: impl Fn(&str) -> Option<OptionKind>,
) -> OptionStatus {
    let Some((key, value)) = option.split_once('=') else {
        debug!(option, "missing key or no key/value separator");
        return OptionStatus::Malformed;
    };
    let key = key.trim();
    if key.is_empty() {
        debug!(option, "missing key or no key/value separator");
        return OptionStatus::Malformed;
    }

    let Some(kind) = find(key) else {
        return OptionStatus::NotFound;
    };

    if value.is_empty() {
        dict.remove(key);
        return OptionStatus::Applied;
    }
    if !value_parses(kind, value) {
        return OptionStatus::Malformed;
    }

    debug!(key, value, "setting option");
    let append = kind.is_flags() && value.starts_with(['+', '-']);
    dict.set(key, value, append);
    OptionStatus::Applied
}

fn value_parses(kind: OptionKind, value: &str) -> bool {
    match kind {
        OptionKind::Int => parse_int(value).is_some(),
        OptionKind::Float => value.parse::<f64>().is_ok(),
        OptionKind::Rational => parse_rational(value).is_some(),
        OptionKind::Bool => matches!(value, "0" | "1" | "true" | "false"),
        OptionKind::String => true,
        OptionKind::Flags(names) => flag_names(value).all(|name| names.contains(&name)),
        OptionKind::LibraryFlags => flag_names(value).next().is_some(),
    }
}

/**
    Parse an integer with an optional `k`, `M` or `G` suffix.
*/
pub fn parse_int(value: &str) -> Option<i64> {
    let (digits, scale) = match value.as_bytes().last()? {
        b'k' | b'K' => (&value[..value.len() - 1], 1_000),
        b'M' => (&value[..value.len() - 1], 1_000_000),
        b'G' => (&value[..value.len() - 1], 1_000_000_000),
        _ => (value, 1),
    };
    digits.parse::<i64>().ok()?.checked_mul(scale)
}

/**
    Parse `num/den`, `num:den` or a plain number.
*/
pub fn parse_rational(value: &str) -> Option<(i64, i64)> {
    if let Some((num, den)) = value.split_once(['/', ':']) {
        let den = den.parse::<i64>().ok()?;
        if den == 0 {
            return None;
        }
        return Some((num.parse().ok()?, den));
    }
    value.parse::<i64>().ok().map(|num| (num, 1))
}

fn flag_names(value: &str) -> impl Iterator<Item = &str> {
    value.split(['+', '-']).filter(|name| !name.is_empty())
}

/**
    Evaluate a `+a-b` flag string: true if `flag` is set by the last
    occurrence of its name. A leading name without sign counts as set.
*/
pub fn value_has_flag(value: &str, flag: &str) -> bool {
    let mut state = true;
    let mut result = false;
    let mut rest = value;
    while !rest.is_empty() {
        let len = rest.find(['+', '-']).unwrap_or(rest.len());
        if len == 0 {
            state = rest.starts_with('+');
            rest = &rest[1..];
        } else {
            if &rest[..len] == flag {
                result = state;
            }
            rest = &rest[len..];
        }
    }
    result
}
