use anyhow::Result;

use buildplan_rbac::list_modules;

pub fn run(json: bool) -> Result<()> {
    let modules = list_modules();
    if json {
        println!("{}", serde_json::to_string_pretty(modules)?);
        return Ok(());
    }

    println!("{:<12} {:<12} ACTIONS", "ID", "NAME");
    println!("{}", "-".repeat(50));
    for m in modules {
        let actions: Vec<&str> = m.actions.iter().map(|a| a.as_str()).collect();
        println!("{:<12} {:<12} {}", m.id, m.name, actions.join(", "));
    }
    Ok(())
}
