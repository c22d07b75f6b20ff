use std::collections::BTreeSet;

use regex::Regex;

/// Built-in technology vocabulary recognised in résumés and job descriptions.
pub const IT_SKILLS: &[&str] = &[
    "python", "java", "javascript", "typescript", "c++", "c#", "ruby", "php", "swift",
    "kotlin", "scala", "rust", "golang", "html", "css", "react", "angular", "vue", "node.js",
    "express", "django", "flask", "laravel", "spring", "hibernate", "aws", "azure", "gcp",
    "docker", "kubernetes", "terraform", "ansible", "jenkins", "github actions", "gitlab ci",
    "sql", "mysql", "postgresql", "mongodb", "oracle", "nosql", "redis", "elasticsearch",
    "hadoop", "spark", "kafka", "rabbitmq", "tensorflow", "pytorch", "scikit-learn", "pandas",
    "numpy", "matplotlib", "power bi", "tableau", "excel", "linux", "unix", "windows",
    "networking", "cybersecurity", "penetration testing", "encryption", "firewall", "vpn",
    "dns", "dhcp", "tcp/ip", "agile", "scrum", "kanban", "jira", "confluence", "git", "svn",
    "rest api", "graphql", "soap", "json", "xml", "yaml", "oauth", "jwt", "sso", "ldap",
    "active directory", "selenium", "cypress", "jest", "mocha", "chai", "junit", "testng",
    "ci/cd", "devops", "sre", "infrastructure as code", "cloud computing", "microservices",
    "serverless", "soa", "etl", "data warehousing", "data mining", "machine learning",
    "deep learning", "nlp", "computer vision", "big data", "bioinformatics",
    "product management", "project management", "scrum master", "product owner", "ux/ui",
    "figma", "sketch", "adobe xd", "mobile development", "ios", "android", "flutter",
    "react native", "xamarin", "unity", "game development", "blockchain", "cryptocurrency",
    "smart contracts", "iot", "embedded systems", "robotics", "ar/vr", "data science",
    "business intelligence", "data analysis", "data visualization",
];

/// Whole-word, case-insensitive skill finder over the built-in vocabulary plus any
/// user-supplied skills.
#[derive(Debug, Clone)]
pub struct SkillMatcher {
    pattern: Regex,
}

impl SkillMatcher {
    pub fn new(extra: &[String]) -> Result<Self, regex::Error> {
        let mut vocabulary: Vec<String> = IT_SKILLS.iter().map(|s| s.to_string()).collect();
        vocabulary.extend(
            extra
                .iter()
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty()),
        );
        vocabulary.sort();
        vocabulary.dedup();
        // Longest first so "javascript" wins over "java" at the same position.
        vocabulary.sort_by_key(|s| std::cmp::Reverse(s.len()));

        let alternation = vocabulary
            .iter()
            .map(|s| regex::escape(s))
            .collect::<Vec<_>>()
            .join("|");
        // Group 1 is the skill; the surrounding groups stand in for word boundaries,
        // which `\b` gets wrong next to symbols such as "c++" or ".net".
        let pattern = Regex::new(&format!(
            r"(?:^|[^\p{{Alphabetic}}\p{{N}}])({alternation})(?:$|[^\p{{Alphabetic}}\p{{N}}])"
        ))?;
        Ok(Self { pattern })
    }

    /// Sorted, unique, lowercase skills mentioned in `text`.
    pub fn extract(&self, text: &str) -> Vec<String> {
        let lower = text.to_lowercase();
        let mut found = BTreeSet::new();

        // Resume right after each skill so its trailing separator can lead the next one.
        let mut at = 0;
        while let Some(caps) = self.pattern.captures_at(&lower, at) {
            let Some(skill) = caps.get(1) else { break };
            found.insert(skill.as_str().to_string());
            at = skill.end();
        }

        found.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher() -> SkillMatcher {
        SkillMatcher::new(&[]).unwrap()
    }

    #[test]
    fn test_whole_words_only() {
        let skills = matcher().extract("Scalable systems on GitHub with a community of users");
        assert!(skills.is_empty(), "{skills:?}");
    }

    #[test]
    fn test_symbols_and_phrases_are_recognised() {
        let skills = matcher().extract(
            "Senior C++ and C# developer. Node.js, CI/CD, Machine Learning; JavaScript.",
        );
        assert_eq!(
            skills,
            vec!["c#", "c++", "ci/cd", "javascript", "machine learning", "node.js"]
        );
    }

    #[test]
    fn test_results_are_unique_and_sorted() {
        let skills = matcher().extract("python PYTHON Python, docker and AWS");
        assert_eq!(skills, vec!["aws", "docker", "python"]);
    }

    #[test]
    fn test_shorter_skill_survives_longer_rejected_phrase() {
        let skills = matcher().extract("We need scrum masters and react natives");
        assert_eq!(skills, vec!["react", "scrum"]);
    }

    #[test]
    fn test_adjacent_skills_share_a_separator() {
        let skills = matcher().extract("rust,go sql");
        assert!(skills.contains(&"rust".to_string()), "{skills:?}");
        assert!(skills.contains(&"sql".to_string()), "{skills:?}");
    }

    #[test]
    fn test_user_skills_extend_vocabulary() {
        let matcher = SkillMatcher::new(&["Elixir".to_string(), " ".to_string()]).unwrap();
        assert_eq!(matcher.extract("Phoenix and elixir"), vec!["elixir"]);
    }
}
