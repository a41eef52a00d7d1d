use crate::domain::template;
use crate::domain::version::Version;
use crate::error::{PolyversError, Result};
use regex::Regex;
use std::fmt;

/// Prefix placed before the version in tags
pub const DEFAULT_VPREFIX: &str = "v";

/// Tag format for projects sharing one repository: `foo-v1.2.3`
pub const PVTAG_FORMAT: &str = "{pname}-{vprefix}{version}";

/// Parses tags made by [`PVTAG_FORMAT`], plus the describe suffix `-N-gHASH`.
pub const PVTAG_REGEX: &str = r"(?xmi)
    ^(?P<pname>{pname})
    -
    {vprefix}(?P<version>\d[^-]*)
    (?:-(?P<descid>\d+-g[a-f\d]+))?$
";

/// Tag format for a repository holding a single project: `v1.2.3`
pub const VTAG_FORMAT: &str = "{vprefix}{version}";

/// Parses tags made by [`VTAG_FORMAT`].
pub const VTAG_REGEX: &str = r"(?xmi)
    ^(?P<pname>)
    {vprefix}(?P<version>\d[^-]*)
    (?:-(?P<descid>\d+-g[a-f\d]+))?$
";

const FORMAT_FIELDS: &[&str] = &["pname", "version", "vprefix"];
const REGEX_FIELDS: &[&str] = &["pname", "vprefix"];

/// Describe suffix: commits since the tag and the abbreviated HEAD hash
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescId {
    pub distance: u32,
    pub short_hash: String,
}

impl DescId {
    pub fn new(distance: u32, short_hash: impl Into<String>) -> Self {
        DescId {
            distance,
            short_hash: short_hash.into(),
        }
    }

    /// Parse `N-gHASH` (e.g., "3-g4f99a6f")
    pub fn parse(s: &str) -> Option<Self> {
        let (distance, hash) = s.split_once("-g")?;
        let distance = distance.parse().ok()?;
        if hash.is_empty() || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        Some(DescId::new(distance, hash.to_lowercase()))
    }
}

impl fmt::Display for DescId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-g{}", self.distance, self.short_hash)
    }
}

/// A tag parsed into project name and version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PvTag {
    pub pname: String,
    pub version: Version,
    pub descid: Option<DescId>,
}

impl PvTag {
    /// Commits between the tag and HEAD; 0 when HEAD is on the tag
    pub fn distance(&self) -> u32 {
        self.descid.as_ref().map_or(0, |d| d.distance)
    }

    /// The version with the descid appended as local segments,
    /// e.g. `1.7.4.post0+2.g79ceebf8`.
    pub fn describe_version(&self) -> Version {
        self.descid
            .as_ref()
            .filter(|d| d.distance > 0)
            .and_then(|d| {
                let label = format!("{}.g{}", d.distance, d.short_hash);
                self.version.with_local_label(&label).ok()
            })
            .unwrap_or_else(|| self.version.clone())
    }
}

/// Bidirectional tag naming for one project: formats versions into tag names
/// and parses tag names (or describe output) back into [`PvTag`]s.
#[derive(Debug, Clone)]
pub struct TagPattern {
    pname: String,
    vprefix: String,
    format: String,
    regex_template: String,
    regex: Regex,
}

impl TagPattern {
    /// Compile a format/regex template pair for `pname`.
    ///
    /// Fails eagerly on unknown template fields, a format without
    /// `{version}`, an invalid regex, or a regex without a `version` group.
    pub fn new(pname: &str, vprefix: &str, format: &str, regex_template: &str) -> Result<Self> {
        template::check_fields(format, FORMAT_FIELDS)?;
        if !template::fields(format).contains(&"version") {
            return Err(PolyversError::template(
                format,
                "tag format must contain {version}",
            ));
        }

        template::check_fields(regex_template, REGEX_FIELDS)?;
        let source = template::render(
            regex_template,
            &[
                ("pname", &regex::escape(pname)),
                ("vprefix", &regex::escape(vprefix)),
            ],
        );
        let regex = Regex::new(&source)
            .map_err(|e| PolyversError::template(regex_template, e.to_string()))?;
        if !regex.capture_names().flatten().any(|name| name == "version") {
            return Err(PolyversError::template(
                regex_template,
                "tag regex must capture a named group 'version'",
            ));
        }

        Ok(TagPattern {
            pname: pname.to_string(),
            vprefix: vprefix.to_string(),
            format: format.to_string(),
            regex_template: regex_template.to_string(),
            regex,
        })
    }

    /// Default pattern for a project in a monorepo
    pub fn pvtag(pname: &str, vprefix: &str) -> Result<Self> {
        TagPattern::new(pname, vprefix, PVTAG_FORMAT, PVTAG_REGEX)
    }

    /// Default pattern for a repository with a single project
    pub fn vtag(pname: &str, vprefix: &str) -> Result<Self> {
        TagPattern::new(pname, vprefix, VTAG_FORMAT, VTAG_REGEX)
    }

    pub fn pname(&self) -> &str {
        &self.pname
    }

    pub fn format_template(&self) -> &str {
        &self.format
    }

    pub fn regex_template(&self) -> &str {
        &self.regex_template
    }

    /// Format a version into a tag name
    /// Example: pname="foo", version="1.2.3" -> "foo-v1.2.3"
    pub fn format(&self, version: &Version) -> String {
        self.render(&version.to_string())
    }

    /// Glob matching every tag of this project, for describe queries
    pub fn glob(&self) -> String {
        self.render("*")
    }

    fn render(&self, version: &str) -> String {
        template::render(
            &self.format,
            &[
                ("pname", &self.pname),
                ("vprefix", &self.vprefix),
                ("version", version),
            ],
        )
    }

    /// Parse a tag name or describe output.
    ///
    /// Non-matching strings, tags of other projects and unparsable versions
    /// all yield `None`.
    pub fn parse(&self, raw: &str) -> Option<PvTag> {
        let caps = self.regex.captures(raw.trim())?;

        let pname = match caps.name("pname").map(|m| m.as_str()) {
            Some(p) if !p.is_empty() => {
                if !p.eq_ignore_ascii_case(&self.pname) {
                    return None;
                }
                p.to_string()
            }
            _ => self.pname.clone(),
        };

        let version = Version::parse(caps.name("version")?.as_str()).ok()?;
        let descid = caps
            .name("descid")
            .and_then(|m| DescId::parse(m.as_str()));

        Some(PvTag {
            pname,
            version,
            descid,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern(pname: &str) -> TagPattern {
        TagPattern::pvtag(pname, DEFAULT_VPREFIX).unwrap()
    }

    #[test]
    fn test_pattern_format() {
        let p = pattern("polyvers");
        assert_eq!(p.format(&Version::new(1, 2, 3)), "polyvers-v1.2.3");
    }

    #[test]
    fn test_pattern_format_custom_vprefix() {
        let p = TagPattern::pvtag("foo", "r").unwrap();
        assert_eq!(p.format(&Version::parse("1.0").unwrap()), "foo-r1.0");
    }

    #[test]
    fn test_pattern_glob() {
        assert_eq!(pattern("foo").glob(), "foo-v*");
        let mono = TagPattern::vtag("foo", "v").unwrap();
        assert_eq!(mono.glob(), "v*");
    }

    #[test]
    fn test_parse_simple() {
        let tag = pattern("proj").parse("proj-v1").unwrap();
        assert_eq!(tag.pname, "proj");
        assert_eq!(tag.version.to_string(), "1");
        assert_eq!(tag.descid, None);
    }

    #[test]
    fn test_parse_with_descid() {
        let tag = pattern("foo-bar").parse("foo-bar-v00.0-1-g4f99a6f").unwrap();
        assert_eq!(tag.pname, "foo-bar");
        assert_eq!(tag.version.to_string(), "0.0");
        assert_eq!(tag.descid, Some(DescId::new(1, "4f99a6f")));
        assert_eq!(tag.distance(), 1);
    }

    #[test]
    fn test_parse_dev_version_with_descid() {
        let tag = pattern("foo_bar")
            .parse("foo_bar-v00.0.dev1-1-g3fb1bfae20")
            .unwrap();
        assert_eq!(tag.version.to_string(), "0.0.dev1");
        assert_eq!(tag.descid.unwrap().short_hash, "3fb1bfae20");
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        let tag = pattern("proj").parse("PROJ-V1.0").unwrap();
        assert_eq!(tag.pname, "PROJ");
        assert_eq!(tag.version, Version::parse("1.0").unwrap());
    }

    #[test]
    fn test_parse_rejects_other_shapes() {
        let p = pattern("proj");
        assert!(p.parse("proj-1.0.5").is_none());
        assert!(p.parse("other-v1.0.5").is_none());
        assert!(p.parse("proj-extra-v1.0.5").is_none());
        assert!(p.parse("v1.0.5").is_none());
    }

    #[test]
    fn test_parse_ignores_malformed_versions() {
        assert!(pattern("proj").parse("proj-v1.0.x.y").is_none());
    }

    #[test]
    fn test_pname_is_regex_escaped() {
        let p = pattern("a.b");
        assert!(p.parse("a.b-v1.0").is_some());
        assert!(p.parse("axb-v1.0").is_none());
    }

    #[test]
    fn test_mono_project_adopts_pname() {
        let p = TagPattern::vtag("solo", "v").unwrap();
        assert_eq!(p.format(&Version::new(0, 3, 0)), "v0.3.0");
        let tag = p.parse("v0.3.0-2-gabcdef0").unwrap();
        assert_eq!(tag.pname, "solo");
        assert_eq!(tag.distance(), 2);
        assert!(p.parse("solo-v0.3.0").is_none());
    }

    #[test]
    fn test_round_trip() {
        let versions = [
            "0.0.0", "1.2.3", "1!2.0", "1.0rc1", "2.0.0b3.post1", "3.0.dev7", "1.0+abc.5",
        ];
        for pname in ["polyvers", "foo-bar", "pvlib", "a.b_c"] {
            let p = pattern(pname);
            for s in versions {
                let version = Version::parse(s).unwrap();
                let tag = p.parse(&p.format(&version)).unwrap();
                assert_eq!(
                    tag,
                    PvTag {
                        pname: pname.to_string(),
                        version: version.clone(),
                        descid: None,
                    }
                );
            }
        }
    }

    #[test]
    fn test_new_rejects_unknown_format_field() {
        let err = TagPattern::new("p", "v", "{pname}-{build}{version}", PVTAG_REGEX).unwrap_err();
        assert!(matches!(err, PolyversError::InvalidTemplate { .. }));
    }

    #[test]
    fn test_new_requires_version_in_format() {
        assert!(TagPattern::new("p", "v", "{pname}", PVTAG_REGEX).is_err());
    }

    #[test]
    fn test_new_rejects_regex_without_version_group() {
        let err = TagPattern::new("p", "v", PVTAG_FORMAT, r"^{pname}-v\d+$").unwrap_err();
        assert!(err.to_string().contains("version"));
    }

    #[test]
    fn test_new_rejects_invalid_regex() {
        assert!(TagPattern::new("p", "v", PVTAG_FORMAT, r"^{pname}-(?P<version>[").is_err());
    }

    #[test]
    fn test_custom_regex_with_quantifier() {
        let p = TagPattern::new(
            "p",
            "v",
            "{pname}/{version}",
            r"^(?P<pname>{pname})/(?P<version>\d{1,3}(?:\.\d+)*)$",
        )
        .unwrap();
        assert_eq!(p.format(&Version::new(1, 0, 0)), "p/1.0.0");
        assert!(p.parse("p/1.0.0").is_some());
        assert!(p.parse("p/1234.0").is_none());
    }

    #[test]
    fn test_descid_parse() {
        assert_eq!(DescId::parse("3-gabc"), Some(DescId::new(3, "abc")));
        assert_eq!(DescId::parse("3-g"), None);
        assert_eq!(DescId::parse("x-gabc"), None);
        assert_eq!(DescId::new(2, "79ceebf8").to_string(), "2-g79ceebf8");
    }

    #[test]
    fn test_describe_version() {
        let tag = PvTag {
            pname: "pvlib".into(),
            version: Version::parse("1.7.4.post0").unwrap(),
            descid: Some(DescId::new(2, "79ceebf8")),
        };
        assert_eq!(tag.describe_version().to_string(), "1.7.4.post0+2.g79ceebf8");

        let exact = PvTag {
            descid: None,
            ..tag
        };
        assert_eq!(exact.describe_version().to_string(), "1.7.4.post0");
    }
}
