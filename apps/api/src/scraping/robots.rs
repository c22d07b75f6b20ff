/// `Allow`/`Disallow` prefixes that apply to every crawler (`User-agent: *`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RobotsRules {
    allow: Vec<String>,
    disallow: Vec<String>,
}

impl RobotsRules {
    /// Rules that permit everything, used when robots.txt cannot be fetched.
    pub fn allow_all() -> Self {
        Self::default()
    }

    pub fn parse(body: &str) -> Self {
        let mut rules = RobotsRules::default();
        let mut group_is_wildcard = false;
        let mut in_agent_block = false;

        for raw in body.lines() {
            let line = raw.split('#').next().unwrap_or("").trim();
            let Some((field, value)) = line.split_once(':') else {
                continue;
            };
            let field = field.trim().to_ascii_lowercase();
            let value = value.trim();

            match field.as_str() {
                "user-agent" => {
                    // Consecutive user-agent lines share one group.
                    if !in_agent_block {
                        group_is_wildcard = false;
                    }
                    in_agent_block = true;
                    group_is_wildcard |= value == "*";
                }
                "allow" | "disallow" => {
                    in_agent_block = false;
                    if !group_is_wildcard || value.is_empty() {
                        continue;
                    }
                    let prefix = value.trim_end_matches('*').to_string();
                    if field == "allow" {
                        rules.allow.push(prefix);
                    } else {
                        rules.disallow.push(prefix);
                    }
                }
                _ => in_agent_block = false,
            }
        }

        rules
    }

    /// The longest matching prefix wins; ties go to `Allow`.
    pub fn is_allowed(&self, path: &str) -> bool {
        let longest = |prefixes: &[String]| {
            prefixes
                .iter()
                .filter(|p| path.starts_with(p.as_str()))
                .map(|p| p.len())
                .max()
        };

        match (longest(&self.allow), longest(&self.disallow)) {
            (_, None) => true,
            (None, Some(_)) => false,
            (Some(allow), Some(disallow)) => allow >= disallow,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROBOTS: &str = "\
# sample
User-agent: Googlebot
Disallow: /

User-agent: *
Disallow: /job/apply
Disallow: /private*
Allow: /private/public
Disallow:

User-agent: Bingbot
Disallow: /jobs
";

    #[test]
    fn test_only_wildcard_group_applies() {
        let rules = RobotsRules::parse(ROBOTS);
        assert!(rules.is_allowed("/jobs?keywords=rust"));
        assert!(rules.is_allowed("/job/123"));
        assert!(!rules.is_allowed("/job/apply/123"));
    }

    #[test]
    fn test_longest_allow_overrides_disallow() {
        let rules = RobotsRules::parse(ROBOTS);
        assert!(!rules.is_allowed("/private/notes"));
        assert!(rules.is_allowed("/private/public/page"));
    }

    #[test]
    fn test_shared_agent_lines_form_one_group() {
        let rules = RobotsRules::parse("User-agent: foo\nUser-agent: *\nDisallow: /search\n");
        assert!(!rules.is_allowed("/search?q=1"));
    }

    #[test]
    fn test_empty_file_allows_everything() {
        let rules = RobotsRules::parse("");
        assert_eq!(rules, RobotsRules::allow_all());
        assert!(rules.is_allowed("/anything"));
    }
}
