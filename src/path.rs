use std::fmt::Display;

use smallvec::SmallVec;

use crate::accessor::check_property_name;
use crate::{Error, PropertyName, Result};

/// A non-empty route of property names from a root object, e.g. `a.b.c`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Path {
	segments: SmallVec<[PropertyName; 4]>,
}

impl Path {
	pub fn new<I>(segments: I) -> Result<Self>
	where
		I: IntoIterator,
		I::Item: Into<PropertyName>,
	{
		let segments = segments
			.into_iter()
			.map(Into::into)
			.collect::<SmallVec<[PropertyName; 4]>>();

		if segments.is_empty() {
			return Err(Error::InvalidArgument("path is empty".into()));
		}

		for segment in &segments {
			check_property_name(segment)?;
		}

		Ok(Path { segments })
	}

	/// Splits a dotted selector such as `"S2.S1.v"`.
	pub fn parse(selector: &str) -> Result<Self> {
		let selector = selector.trim();
		if selector.is_empty() {
			return Err(Error::InvalidArgument("path is empty".into()));
		}

		Path::new(selector.split('.').map(str::trim)).map_err(|_| {
			Error::InvalidArgument(format!("`{}` is not a property access path", selector))
		})
	}

	pub fn len(&self) -> usize {
		self.segments.len()
	}

	pub fn segments(&self) -> &[PropertyName] {
		&self.segments
	}

	pub fn leaf(&self) -> &PropertyName {
		&self.segments[self.segments.len() - 1]
	}
}

impl Display for Path {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		for (index, segment) in self.segments.iter().enumerate() {
			if index > 0 {
				f.write_str(".")?;
			}
			f.write_str(segment)?;
		}
		Ok(())
	}
}

impl TryFrom<&str> for Path {
	type Error = Error;
	fn try_from(selector: &str) -> Result<Self> {
		Path::parse(selector)
	}
}

impl TryFrom<&[&str]> for Path {
	type Error = Error;
	fn try_from(segments: &[&str]) -> Result<Self> {
		Path::new(segments.iter().copied())
	}
}

impl<const N: usize> TryFrom<[&str; N]> for Path {
	type Error = Error;
	fn try_from(segments: [&str; N]) -> Result<Self> {
		Path::new(segments)
	}
}

impl TryFrom<Vec<&str>> for Path {
	type Error = Error;
	fn try_from(segments: Vec<&str>) -> Result<Self> {
		Path::new(segments)
	}
}

impl TryFrom<Vec<String>> for Path {
	type Error = Error;
	fn try_from(segments: Vec<String>) -> Result<Self> {
		Path::new(segments)
	}
}

#[cfg(test)]
mod tests {
	use super::Path;
	use crate::Error;

	#[test]
	fn parses_dotted_selector() {
		let path = Path::parse("S2.S1.v").unwrap();
		assert_eq!(path.len(), 3);
		assert_eq!(&*path.segments()[1], "S1");
		assert_eq!(&**path.leaf(), "v");
		assert_eq!(path.to_string(), "S2.S1.v");
	}

	#[test]
	fn rejects_empty_paths() {
		assert!(matches!(Path::parse(""), Err(Error::InvalidArgument(_))));
		assert!(matches!(Path::parse("a..b"), Err(Error::InvalidArgument(_))));
		assert!(matches!(
			Path::new(Vec::<String>::new()),
			Err(Error::InvalidArgument(_))
		));
	}
}
