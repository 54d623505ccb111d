use std::env;

use domoticz_thermostat::{
    AccessoryPlugin, Characteristic, HapCapabilities, ThermostatAccessory, ThermostatConfig,
};

/// Reads every thermostat characteristic once for each `DomoticzThermostat`
/// entry of a host config.json.
#[tokio::main]
async fn main() -> domoticz_thermostat::Result<()> {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = env::args().collect();
    let path = args.get(1).expect("usage: probe <config.json>");

    let configs = ThermostatConfig::from_host_config_file(path)?;
    if configs.is_empty() {
        println!("No DomoticzThermostat accessories in {path}");
        return Ok(());
    }

    for config in configs {
        let name = config.name.clone();
        let accessory = ThermostatAccessory::new(config, HapCapabilities::standard())?;
        println!("[{name}]");
        for characteristic in Characteristic::THERMOSTAT {
            match accessory.get(characteristic).await {
                Ok(value) => println!("  {characteristic}: {value}"),
                Err(e) => println!("  {characteristic}: error ({:?}): {e}", e.kind()),
            }
        }
    }

    Ok(())
}
