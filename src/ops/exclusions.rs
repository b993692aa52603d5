//! Directories the selected platforms want left out of copies.

use serde::Serialize;

use crate::core::repository::RepositoryContext;
use crate::ops::detect::DetectedPlatform;

/// Exclusion lists for the build output and the intermediate directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Exclusions {
    pub build_output: Vec<String>,
    pub intermediate: Vec<String>,
}

impl Exclusions {
    pub fn is_empty(&self) -> bool {
        self.build_output.is_empty() && self.intermediate.is_empty()
    }
}

/// Collect every selected platform's exclusions, first occurrence wins.
pub fn collect_exclusions(ctx: &RepositoryContext<'_>, detected: &[DetectedPlatform]) -> Exclusions {
    let mut exclusions = Exclusions::default();
    for d in detected {
        push_unique(
            &mut exclusions.build_output,
            d.platform.directories_to_exclude_from_build_output(ctx),
        );
        push_unique(
            &mut exclusions.intermediate,
            d.platform.directories_to_exclude_from_intermediate(ctx),
        );
    }
    exclusions
}

fn push_unique(into: &mut Vec<String>, dirs: Vec<String>) {
    for dir in dirs {
        if !into.contains(&dir) {
            into.push(dir);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::detect::detect_and_resolve;
    use crate::test_support::{registry_of, repo_with, test_options, TestPlatform};
    use std::sync::Arc;

    #[test]
    fn test_intermediate_exclusions_deduplicated() {
        let repo = repo_with(&[]);
        let mut opts = test_options();
        opts.enable_multi_platform_build = true;
        let ctx = RepositoryContext::new(&repo, &opts);

        let registry = registry_of(vec![Arc::new(TestPlatform::new("a")), Arc::new(TestPlatform::new("b"))]);
        let detected = detect_and_resolve(&registry, &ctx).unwrap();
        let exclusions = collect_exclusions(&ctx, &detected);

        assert_eq!(exclusions.intermediate, vec!["a_cache", "shared_cache", "b_cache"]);
        assert!(exclusions.build_output.is_empty());
    }

    #[test]
    fn test_python_virtualenv_exclusions() {
        let repo = repo_with(&[("requirements.txt", "flask\n")]);
        let mut opts = test_options();
        opts.properties.insert("virtualenv_name".into(), "pythonenv".into());
        opts.properties.insert("compress_virtualenv".into(), "zip".into());
        let ctx = RepositoryContext::new(&repo, &opts);

        let registry = crate::platforms::PlatformRegistry::with_defaults(&opts);
        let detected = detect_and_resolve(&registry, &ctx).unwrap();
        let exclusions = collect_exclusions(&ctx, &detected);

        assert_eq!(exclusions.build_output, vec!["pythonenv"]);
        assert!(exclusions.intermediate.contains(&"pythonenv.zip".to_string()));
    }
}
