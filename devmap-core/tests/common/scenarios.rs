//! Pre-built projects for integration testing
//!
//! Each scenario returns a project on the Uno from [`Catalog`] together with
//! the device ids the tests inspect.

use devmap_core::{Project, ProjectDeviceId};

use super::{use_on, Catalog, READING};

/// One LED dimmed over `0..=max`
pub fn blink(catalog: &Catalog, max: f64) -> (Project, ProjectDeviceId) {
    let mut project = catalog.project();
    let led = project.add_device("led1", catalog.led);
    use_on(&mut project, led, 0.0, max);
    (project, led)
}

/// Two temperature sensors reading Celsius
pub fn weather_station(catalog: &Catalog) -> (Project, ProjectDeviceId, ProjectDeviceId) {
    let mut project = catalog.project();
    let indoor = project.add_device("indoor", catalog.temperature);
    let outdoor = project.add_device("outdoor", catalog.temperature);
    for id in [indoor, outdoor] {
        project.usage_mut(id).unwrap().read_value(READING, None).unwrap();
    }
    (project, indoor, outdoor)
}

/// `count` plain LEDs, each used with the default brightness range
pub fn led_crowd(catalog: &Catalog, count: usize) -> (Project, Vec<ProjectDeviceId>) {
    let mut project = catalog.project();
    let leds = (0..count)
        .map(|i| {
            let id = project.add_device(format!("led{}", i + 1), catalog.led);
            use_on(&mut project, id, 0.0, 100.0);
            id
        })
        .collect();
    (project, leds)
}

/// Three devices; the second asks for a brightness no part offers
pub fn three_with_unsatisfiable(catalog: &Catalog) -> (Project, [ProjectDeviceId; 3]) {
    let mut project = catalog.project();
    let first = project.add_device("a_led", catalog.led);
    let second = project.add_device("b_led", catalog.led);
    let third = project.add_device("c_temp", catalog.temperature);
    use_on(&mut project, first, 0.0, 100.0);
    use_on(&mut project, second, 0.0, 1000.0);
    project.usage_mut(third).unwrap().read_value(READING, None).unwrap();
    (project, [first, second, third])
}
