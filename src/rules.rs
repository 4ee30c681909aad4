use crate::error::Result;
use crate::wildcard::WildcardPattern;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A named region and the department-code patterns that select it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RegionRule {
    pub region: String,
    pub patterns: Vec<String>,
}

/// Ordered region rules. Evaluation walks regions in list order and each
/// region's patterns in list order; the first match wins.
///
/// Serialized as nested string lists: `[["台北區", ["*004-002*"]], ...]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<(String, Vec<String>)>", into = "Vec<(String, Vec<String>)>")]
pub struct RegionRuleSet {
    rules: Vec<RegionRule>,
}

impl RegionRuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// The preset regions offered before the user edits anything.
    pub fn default_rules() -> Self {
        [
            ("本部", "*004-000"),
            ("台南區", "*004-001*"),
            ("台北區", "*004-002*"),
            ("新竹區", "*004-003*"),
            ("澎湖區", "*004-004*"),
            ("台中區", "*004-005*"),
            ("高雄區", "*004-006*"),
        ]
        .into_iter()
        .fold(Self::new(), |set, (region, pattern)| {
            set.with_rule(region, [pattern])
        })
    }

    /// Builder form of repeated [`add_pattern`](Self::add_pattern) calls.
    pub fn with_rule<I, S>(mut self, region: &str, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for pattern in patterns {
            self.add_pattern(region, pattern.as_ref());
        }
        self
    }

    /// Appends a pattern to a region, creating the region at the end of the
    /// list if it is new. Blank input is ignored.
    pub fn add_pattern(&mut self, region: &str, pattern: &str) {
        if region.is_empty() || pattern.is_empty() {
            return;
        }

        match self.rules.iter_mut().find(|r| r.region == region) {
            Some(rule) => rule.patterns.push(pattern.to_string()),
            None => self.rules.push(RegionRule {
                region: region.to_string(),
                patterns: vec![pattern.to_string()],
            }),
        }
    }

    /// Removes every occurrence of `pattern` from `region`; a region left
    /// without patterns is dropped. Returns whether anything was removed.
    pub fn remove_pattern(&mut self, region: &str, pattern: &str) -> bool {
        let Some(index) = self.rules.iter().position(|r| r.region == region) else {
            return false;
        };

        let rule = &mut self.rules[index];
        let before = rule.patterns.len();
        rule.patterns.retain(|p| p != pattern);
        let removed = rule.patterns.len() != before;

        if rule.patterns.is_empty() {
            self.rules.remove(index);
        }

        removed
    }

    pub fn rules(&self) -> &[RegionRule] {
        &self.rules
    }

    pub fn region_names(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|r| r.region.as_str())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn compile(&self) -> Result<CompiledRuleSet> {
        let regions = self
            .rules
            .iter()
            .map(|rule| {
                let patterns = rule
                    .patterns
                    .iter()
                    .map(|p| WildcardPattern::new(p))
                    .collect::<Result<Vec<_>>>()?;
                Ok((rule.region.clone(), patterns))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(CompiledRuleSet { regions })
    }
}

impl JsonSchema for RegionRuleSet {
    fn schema_name() -> String {
        "RegionRuleSet".to_string()
    }

    fn json_schema(gen: &mut schemars::gen::SchemaGenerator) -> schemars::schema::Schema {
        <Vec<(String, Vec<String>)>>::json_schema(gen)
    }
}

impl From<Vec<(String, Vec<String>)>> for RegionRuleSet {
    fn from(pairs: Vec<(String, Vec<String>)>) -> Self {
        let mut set = Self::new();
        for (region, patterns) in pairs {
            for pattern in patterns {
                set.add_pattern(&region, &pattern);
            }
        }
        set
    }
}

impl From<RegionRuleSet> for Vec<(String, Vec<String>)> {
    fn from(set: RegionRuleSet) -> Self {
        set.rules
            .into_iter()
            .map(|rule| (rule.region, rule.patterns))
            .collect()
    }
}

/// A rule set with every wildcard compiled, ready for repeated lookups.
#[derive(Debug, Clone)]
pub struct CompiledRuleSet {
    regions: Vec<(String, Vec<WildcardPattern>)>,
}

impl CompiledRuleSet {
    /// First region (in rule order) owning a pattern that matches the code.
    pub fn region_for(&self, department_code: &str) -> Option<&str> {
        self.regions
            .iter()
            .find(|(_, patterns)| patterns.iter().any(|p| p.matches(department_code)))
            .map(|(region, _)| region.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rules_order() {
        let rules = RegionRuleSet::default_rules();
        let names: Vec<&str> = rules.region_names().collect();
        assert_eq!(
            names,
            vec!["本部", "台南區", "台北區", "新竹區", "澎湖區", "台中區", "高雄區"]
        );
        assert_eq!(rules.rules()[0].patterns, vec!["*004-000"]);
    }

    #[test]
    fn test_add_and_remove_patterns() {
        let mut rules = RegionRuleSet::new();
        rules.add_pattern("North", "10*");
        rules.add_pattern("South", "20*");
        rules.add_pattern("North", "11*");
        rules.add_pattern("", "30*");
        rules.add_pattern("East", "");

        assert_eq!(rules.len(), 2);
        assert_eq!(rules.rules()[0].patterns, vec!["10*", "11*"]);

        assert!(rules.remove_pattern("North", "10*"));
        assert!(!rules.remove_pattern("North", "99*"));
        assert!(!rules.remove_pattern("West", "10*"));
        assert_eq!(rules.len(), 2);

        assert!(rules.remove_pattern("North", "11*"));
        let names: Vec<&str> = rules.region_names().collect();
        assert_eq!(names, vec!["South"]);
    }

    #[test]
    fn test_first_match_wins_across_regions() {
        let rules = RegionRuleSet::new()
            .with_rule("R1", ["10*"])
            .with_rule("R2", ["1*"]);
        let compiled = rules.compile().unwrap();

        assert_eq!(compiled.region_for("105"), Some("R1"));
        assert_eq!(compiled.region_for("115"), Some("R2"));
        assert_eq!(compiled.region_for("205"), None);
    }

    #[test]
    fn test_serializes_as_nested_lists() {
        let rules = RegionRuleSet::new()
            .with_rule("R1", ["10*", "11*"])
            .with_rule("R2", ["2*"]);

        let json = serde_json::to_string(&rules).unwrap();
        assert_eq!(json, r#"[["R1",["10*","11*"]],["R2",["2*"]]]"#);

        let back: RegionRuleSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, rules);
    }

    #[test]
    fn test_deserializing_drops_empty_regions() {
        let rules: RegionRuleSet = serde_json::from_str(r#"[["R1",[]],["R2",["2*"]]]"#).unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules.rules()[0].region, "R2");
    }
}
