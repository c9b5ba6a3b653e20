use anyhow::Result;

use skycast_weather::{display_temperature, TemperatureUnit};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize core
    skycast_core::init()?;

    // Create the application; it owns the city store for this session
    let app = skycast_core::App::new()?;
    let store = app.store().clone();

    tracing::info!("Skycast application started");
    println!("Skycast - City Weather");
    println!("  Config directory: {}", app.config().config_dir.display());

    let selection_log = store.subscribe_selection(|city| match city {
        Some(city) => println!("  [selection] {} ({})", city.name, city.id),
        None => println!("  [selection] none"),
    })?;
    let refresh_log = store.subscribe_refresh(|outcome| {
        let status = if outcome.success { "ok" } else { "failed" };
        println!("  [refresh] {} {}", outcome.city_id, status);
    })?;

    let added = store.add_city_named("苏州市")?.wait().await?;
    let ticket = store.refresh_selected_weather()?;
    store.toggle_unit()?;
    if let Some(weather) = ticket.wait().await {
        tracing::info!(
            "Refreshed {} ({})",
            weather.city_id,
            weather.category.animation().resource_name()
        );
    }
    store.sync().await?;

    let unit = store.temperature_unit();
    println!("\nCities ({}):", unit.symbol());
    for city in store.list_cities().iter() {
        let marker = if city.is_selected { "*" } else { " " };
        match store.get_weather(city.id) {
            Some(weather) => println!(
                " {} {:<6} {} {} {}  feels {}  {}%  {} m/s  {} hPa  {} km",
                marker,
                city.name,
                weather.icon(),
                weather.condition(),
                display_temperature(weather.temperature, unit),
                display_temperature(weather.feels_like, unit),
                weather.humidity,
                weather.wind_speed,
                weather.pressure,
                weather.visibility,
            ),
            None => println!(" {} {:<6} (no data)", marker, city.name),
        }
    }

    store.remove_city(added)?;
    store.set_unit(TemperatureUnit::Celsius)?;
    store.sync().await?;

    selection_log.unsubscribe();
    refresh_log.unsubscribe();

    // Graceful shutdown
    app.shutdown().await;

    Ok(())
}
