// Demo data seeding
use crate::application::monitoring_repository::MonitoringRepository;
use crate::domain::machine::{Machine, NewMachine};
use crate::domain::site::NewSite;

pub const DEMO_MACHINE_KEY: &str = "HAAS-VF2-001";
const DEMO_SITE_NAME: &str = "CNC Manufacturing Facility";

/// Create the demo site and CNC machine unless the machine already exists
pub async fn seed_cnc_machine(repository: &dyn MonitoringRepository, machine_key: &str) -> anyhow::Result<Machine> {
    if let Some(existing) = repository.find_machine_by_key(machine_key).await? {
        tracing::info!("CNC machine {} already exists", machine_key);
        return Ok(existing);
    }

    let site = match repository.find_site_by_name(DEMO_SITE_NAME).await? {
        Some(site) => site,
        None => {
            repository
                .create_site(NewSite {
                    name: DEMO_SITE_NAME.to_string(),
                    location: Some("Building A, Floor 1".to_string()),
                    description: Some("High-precision CNC machining center for production parts".to_string()),
                })
                .await?
        }
    };

    let machine = repository
        .create_machine(NewMachine {
            machine_id: machine_key.to_string(),
            name: "Haas VF-2 CNC Vertical Machining Center".to_string(),
            machine_type: "cnc_mill".to_string(),
            status: "online".to_string(),
            site_id: Some(site.id),
            temperature: Some(42.0),
            vibration: Some(0.8),
            runtime: Some(4520.0),
            efficiency: Some(94.0),
            kw_used: Some(15.5),
            firmware: Some("100.22.000.1000".to_string()),
            model: Some("Haas VF-2".to_string()),
        })
        .await?;

    tracing::info!(machine_id = machine.id, "CNC machine {} seeded", machine_key);
    Ok(machine)
}
