use std::str::FromStr;

use fxhash::FxHashMap;
use tracing::{debug, warn};

use crate::Error;

/// String settings with typed lookups that fall back to a default.
///
/// Keys are case-insensitive.
#[derive(Debug, Clone, Default)]
pub struct Settings {
	values: FxHashMap<String, String>,
}

impl Settings {
	pub fn new() -> Self {
		Settings::default()
	}

	/// Parses a TOML document. Scalars are kept in their textual form;
	/// nested tables contribute their keys as `table.key`. Arrays have no
	/// single-value form and are skipped.
	pub fn parse(text: &str) -> Result<Self, Error> {
		let table: toml::Table =
			toml::from_str(text).map_err(|err| Error::InvalidSettings(err.message().to_owned()))?;
		let mut settings = Settings::new();
		settings.insert_table("", table);
		Ok(settings)
	}

	fn insert_table(&mut self, prefix: &str, table: toml::Table) {
		for (key, value) in table {
			let key = if prefix.is_empty() {
				key
			} else {
				format!("{prefix}.{key}")
			};
			match value {
				toml::Value::String(value) => self.insert(key, value),
				toml::Value::Integer(value) => self.insert(key, value.to_string()),
				toml::Value::Float(value) => self.insert(key, value.to_string()),
				toml::Value::Boolean(value) => self.insert(key, value.to_string()),
				toml::Value::Datetime(value) => self.insert(key, value.to_string()),
				toml::Value::Table(table) => self.insert_table(&key, table),
				toml::Value::Array(_) => warn!(key = %key, "ignoring array setting"),
			}
		}
	}

	/// Collects the environment variables starting with `prefix`, keyed by
	/// the rest of their name.
	pub fn from_env(prefix: &str) -> Self {
		std::env::vars()
			.filter_map(|(key, value)| {
				key.strip_prefix(prefix)
					.filter(|key| !key.is_empty())
					.map(|key| (key.to_owned(), value))
			})
			.collect()
	}

	pub fn insert(&mut self, key: impl AsRef<str>, value: impl Into<String>) {
		self.values
			.insert(key.as_ref().to_ascii_lowercase(), value.into());
	}

	pub fn get(&self, key: &str) -> Option<&str> {
		self.values
			.get(&key.to_ascii_lowercase())
			.map(String::as_str)
	}

	pub fn get_int(&self, key: &str, default: i32) -> i32 {
		self.parsed(key, default)
	}

	/// Accepts `true`/`false` in any case.
	pub fn get_bool(&self, key: &str, default: bool) -> bool {
		match self.get(key).map(str::trim) {
			Some(value) if value.eq_ignore_ascii_case("true") => true,
			Some(value) if value.eq_ignore_ascii_case("false") => false,
			Some(value) => {
				debug!(key, value, "not a boolean, using default");
				default
			}
			None => default,
		}
	}

	/// Blank values count as missing.
	pub fn get_string(&self, key: &str, default: &str) -> String {
		match self.get(key) {
			Some(value) if !value.trim().is_empty() => value.to_owned(),
			_ => default.to_owned(),
		}
	}

	fn parsed<T>(&self, key: &str, default: T) -> T
	where
		T: FromStr,
	{
		let Some(value) = self.get(key) else {
			return default;
		};
		value.trim().parse().unwrap_or_else(|_| {
			debug!(key, value, "unparsable setting, using default");
			default
		})
	}
}

impl<K, V> FromIterator<(K, V)> for Settings
where
	K: AsRef<str>,
	V: Into<String>,
{
	fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
		let mut settings = Settings::new();
		for (key, value) in iter {
			settings.insert(key, value);
		}
		settings
	}
}
