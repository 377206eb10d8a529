//! Scene scaffolding

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::config::SCENE_FILE;

/// Write a starter `frameline.toml` into `path`
pub fn create_scene(path: &Path, template: &str, force: bool) -> Result<()> {
    fs::create_dir_all(path).with_context(|| format!("Failed to create {}", path.display()))?;

    let scene_path = path.join(SCENE_FILE);
    if scene_path.exists() && !force {
        anyhow::bail!(
            "{} already exists. Pass --force to overwrite it.",
            scene_path.display()
        );
    }

    let content = match template {
        "minimal" => template_minimal(),
        "walk" => template_walk(),
        _ => template_default(),
    };
    fs::write(&scene_path, content).with_context(|| format!("Failed to write {}", scene_path.display()))?;

    tracing::info!(path = %scene_path.display(), template, "scene created");
    Ok(())
}

fn template_minimal() -> &'static str {
    r#"[clock]
fps = 30

[[track]]
name = "opacity"
kind = "number"
keyframes = [[0.0, 0.0], [1.0, 1.0]]
"#
}

fn template_default() -> &'static str {
    r#"# Frameline scene
#
# Tracks play on the root timeline at `start` seconds, or relative to an
# earlier track with `after`, `before` or `amidst` plus an `offset`.

[clock]
fps = 10

[timeline]
drag = 0.2

[[track]]
name = "position"
kind = "point"
keyframes = [[0.0, { x = 0.0, y = 0.0 }], [0.5, { x = 3.0, y = 3.0 }], [1.0, { x = 10.0, y = 10.0 }]]

[[track]]
name = "radius"
kind = "number"
keyframes = [[0.0, 0.0], [0.5, 3.0], [1.0, 10.0]]
easing = "ease_out"

[[track]]
name = "tint"
kind = "color"
keyframes = [[0.0, { r = 255.0, g = 0.0, b = 0.0 }], [1.0, { r = 0.0, g = 0.0, b = 255.0 }]]
duration = 0.5
after = "radius"
"#
}

fn template_walk() -> &'static str {
    r#"# Sprite walk cycle inside a looping group

[clock]
fps = 12
seconds = 3.0

[[track]]
name = "x"
kind = "number"
keyframes = [[0.0, 0.0], [1.0, 240.0]]
duration = 3.0

[[group]]
name = "sprite"
loop = true
amidst = "x"

[[group.track]]
name = "frame"
kind = "integer"
keyframes = [[0.0, 0], [1.0, 8]]
duration = 0.75

[[group.track]]
name = "state"
kind = "text"
keyframes = [[0.0, "step-left"], [1.0, "step-right"]]
duration = 0.75
"#
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SceneConfig;
    use crate::scene::Scene;

    #[test]
    fn test_templates_build() {
        for template in [template_minimal(), template_default(), template_walk()] {
            let config = SceneConfig::parse(template).unwrap();
            Scene::build(&config).unwrap();
        }
    }

    #[test]
    fn test_create_scene_refuses_overwrite() {
        let dir = std::env::temp_dir().join(format!("frameline-init-{}", std::process::id()));
        create_scene(&dir, "minimal", false).unwrap();
        assert!(create_scene(&dir, "walk", false).is_err());
        create_scene(&dir, "walk", true).unwrap();
        let written = fs::read_to_string(dir.join(SCENE_FILE)).unwrap();
        assert!(written.contains("sprite"));
        fs::remove_dir_all(&dir).unwrap();
    }
}
