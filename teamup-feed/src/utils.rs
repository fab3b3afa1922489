use serde::Deserialize;

/// Suggestions offered while typing a language on the create-post form.
pub const LANGUAGE_CATALOG: &[&str] = &[
    "JavaScript", "Python", "Java", "C++", "Ruby", "Go", "Rust", "TypeScript",
    "Swift", "PHP", "C#", "Kotlin", "Dart", "Scala", "Elixir", "React", "Vue",
    "Angular", "Svelte", "Ember", "Node.js", "Express.js", "Flask", "Django",
    "Spring", "Laravel", "Ruby on Rails", "ASP.NET", "Flutter", "React Native",
    "Xamarin", "Unity", "Unreal Engine", "jQuery", "Bootstrap", "Tailwind CSS",
    "Sass", "Less", "PostCSS", "WebAssembly", "GraphQL", "Apollo", "Relay", "REST",
    "gRPC", "WebSocket", "Socket.io", "Deno", "Nest.js", "Next.js", "Nuxt.js",
    "Gatsby", "Hugo", "Jekyll", "WordPress", "Drupal", "Magento", "Shopify",
    "BigCommerce", "WooCommerce", "Stripe", "PayPal", "Square", "AWS", "Azure",
    "Google Cloud", "Firebase", "Netlify", "Vercel", "Heroku", "DigitalOcean",
    "Kubernetes", "Docker", "Jenkins", "CircleCI", "Travis CI", "GitHub Actions",
];

pub const TIME_ZONES: &[&str] = &[
    "Eastern Standard Time (EST)",
    "Central Standard Time (CST)",
    "Mountain Standard Time (MST)",
    "Pacific Standard Time (PST)",
    "Alaska Standard Time (AKST)",
    "Hawaii-Aleutian Standard Time (HST)",
];

pub const FIRST_GRAD_YEAR: i32 = 2018;
pub const LAST_GRAD_YEAR: i32 = 2030;

pub fn grad_year_options() -> Vec<i32> {
    (FIRST_GRAD_YEAR..=LAST_GRAD_YEAR).collect()
}

#[derive(Deserialize)]
struct University {
    name: String,
    #[serde(default)]
    country: String,
}

/// University names for the profile form, read from the
/// `world_universities_and_domains.json` dataset and kept to the United States
/// in dataset order.
pub fn united_states_universities(dataset: &str) -> serde_json::Result<Vec<String>> {
    let universities: Vec<University> = serde_json::from_str(dataset)?;
    Ok(universities
        .into_iter()
        .filter(|u| u.country == "United States")
        .map(|u| u.name)
        .collect())
}

/// Catalog entries containing `input` (ignoring case) that are not already
/// in `exclude`. Blank input suggests nothing.
pub fn suggest<'a>(catalog: &[&'a str], input: &str, exclude: &[String]) -> Vec<&'a str> {
    let needle = input.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }
    catalog
        .iter()
        .copied()
        .filter(|entry| entry.to_lowercase().contains(&needle))
        .filter(|entry| !exclude.iter().any(|taken| taken == entry))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suggest_skips_selected() {
        let selected = vec!["Java".to_string()];
        let found = suggest(LANGUAGE_CATALOG, "jav", &selected);
        assert_eq!(found, vec!["JavaScript"]);
    }

    #[test]
    fn test_suggest_blank_input() {
        assert!(suggest(LANGUAGE_CATALOG, "   ", &[]).is_empty());
    }

    #[test]
    fn test_grad_years() {
        let years = grad_year_options();
        assert_eq!(years.len(), 13);
        assert_eq!(years.first(), Some(&2018));
        assert_eq!(years.last(), Some(&2030));
    }

    #[test]
    fn test_united_states_universities() {
        let dataset = r#"[
            {"name": "Rice University", "country": "United States", "domains": ["rice.edu"]},
            {"name": "University of Toronto", "country": "Canada", "domains": ["utoronto.ca"]},
            {"name": "Rice Community College", "country": "United States", "alpha_two_code": "US"},
            {"name": "Nameless Institute"}
        ]"#;
        let names = united_states_universities(dataset).unwrap();
        assert_eq!(names, vec!["Rice University", "Rice Community College"]);

        let catalog: Vec<&str> = names.iter().map(String::as_str).collect();
        let taken = vec!["Rice University".to_string()];
        assert_eq!(suggest(&catalog, "rice", &taken), vec!["Rice Community College"]);

        assert!(united_states_universities("{}").is_err());
    }

    #[test]
    fn test_time_zone_suggestions() {
        assert_eq!(suggest(TIME_ZONES, "pacific", &[]), vec!["Pacific Standard Time (PST)"]);
    }
}
