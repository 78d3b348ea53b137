use console::style;
use ycode_config::YcodeConfig;
use ycode_skills::SkillRegistry;

pub(super) fn cmd_skills(config: &YcodeConfig, name: Option<&str>) -> ycode_core::Result<()> {
    let dirs = config.skill_dirs();
    let registry = SkillRegistry::discover_in(&dirs)?;

    if let Some(name) = name {
        match registry.content(name) {
            Some(content) => println!("{content}"),
            None => println!("Skill '{name}' not found."),
        }
        return Ok(());
    }

    let skills = registry.list();
    if skills.is_empty() {
        let searched: Vec<String> = dirs.iter().map(|d| d.display().to_string()).collect();
        println!("No skills found in {}", searched.join(", "));
        println!("  Add one as <dir>/<name>/SKILL.md");
        return Ok(());
    }

    println!("{}\n", style(format!("Available Skills ({}):", skills.len())).bold());
    for skill in skills {
        let tags = if skill.tags.is_empty() {
            String::new()
        } else {
            format!(" [{}]", skill.tags.join(", "))
        };
        println!("  {}{}", style(&skill.name).cyan(), tags);
        println!("    {}", skill.description);
        println!("    File: {}", skill.file_path.display());
        println!();
    }
    Ok(())
}
