//! Integration tests for candidate mapping
//!
//! Runs the full rule pipeline against the shared catalog and checks both the
//! classification of each candidate and the display order.

mod common;

use devmap_core::{
    ActualDevice, Binding, Candidate, CloudPlatform, Compatibility, DeviceLibrary, DeviceMapper,
    DeviceType, LibraryBinding, MappingCode, MappingConfig, Platform, Project, ProjectDeviceId,
    Unit, Constraint,
};

use common::{scenarios, Catalog, OFF, ON, READING};

fn code(mapper: &DeviceMapper<'_>, project: &Project, device: ProjectDeviceId, candidate: Candidate) -> MappingCode {
    mapper.check(project, device, candidate).expect("candidate resolves").code
}

#[test]
fn led_brightness_range_decides_compatibility() {
    let catalog = Catalog::new();
    let (project, led) = scenarios::blink(&catalog, 100.0);
    let mapper = DeviceMapper::new(&catalog.library, MappingConfig::default());
    let devices = mapper.compute_compatible_devices(&project, led);

    assert!(devices.get_device(catalog.led_255).unwrap().is_ok());
    let mini = devices.get_device(catalog.led_50).unwrap();
    assert_eq!(mini.code, MappingCode::ConstraintMismatch);
    assert!(mini.detail.as_deref().unwrap().starts_with("On.brightness"));
}

#[test]
fn default_parameter_constraint_applies_without_usage_range() {
    let catalog = Catalog::new();
    let mut project = catalog.project();
    let led = project.add_device("led1", catalog.led);
    // On used, brightness never recorded: the generic 0..100 is needed
    project.usage_mut(led).unwrap().use_action(ON);
    let mapper = DeviceMapper::new(&catalog.library, MappingConfig::default());

    assert_eq!(code(&mapper, &project, led, Candidate::Device(catalog.led_50)), MappingCode::ConstraintMismatch);
    assert_eq!(code(&mapper, &project, led, Candidate::Device(catalog.led_255)), MappingCode::Ok);
}

#[test]
fn unsupported_action_is_reported_as_such() {
    let mut builder = DeviceLibrary::builder();
    let led = builder.add_generic(common::led_generic()).unwrap();
    let uno = builder.add_device(common::controller(led)).unwrap();
    let on_only = builder
        .add_device(
            ActualDevice::new("on_only", "Generic", "Always-on LED", DeviceType::Virtual)
                .with_platform(Platform::ArduinoAvr8, LibraryBinding::new("MP_Led"))
                .with_compatibility(led, Compatibility::new(1).with_action(ON, [])),
        )
        .unwrap();
    let library = builder.build();

    let mut project = Project::new("p", Platform::ArduinoAvr8);
    project.set_controller(&library, Some(uno)).unwrap();
    let slot = project.add_device("led1", led);
    project.usage_mut(slot).unwrap().use_action(OFF);

    let mapper = DeviceMapper::new(&library, MappingConfig::default());
    let result = mapper.check(&project, slot, Candidate::Device(on_only)).unwrap();
    assert_eq!(result.code, MappingCode::UnsupportedAction);
    assert_eq!(result.detail.as_deref(), Some("Off"));
}

#[test]
fn wrong_generic_and_value_constraints() {
    let catalog = Catalog::new();
    let (mut project, indoor, _) = scenarios::weather_station(&catalog);
    let mapper = DeviceMapper::new(&catalog.library, MappingConfig::default());

    assert_eq!(
        code(&mapper, &project, indoor, Candidate::Device(catalog.led_255)),
        MappingCode::UnsupportedGenericDevice
    );
    assert_eq!(code(&mapper, &project, indoor, Candidate::Device(catalog.bme280)), MappingCode::Ok);

    let hot = Constraint::numeric(-50.0, 120.0, Unit::Celsius).unwrap();
    project.usage_mut(indoor).unwrap().read_value(READING, Some(hot)).unwrap();
    assert_eq!(
        code(&mapper, &project, indoor, Candidate::Device(catalog.bme280)),
        MappingCode::ConstraintMismatch
    );
}

#[test]
fn platform_change_rejects_every_part() {
    let catalog = Catalog::new();
    let (mut project, led) = scenarios::blink(&catalog, 100.0);
    project.set_platform(Platform::Raspberrypi);
    let mapper = DeviceMapper::new(&catalog.library, MappingConfig::default());

    let devices = mapper.compute_compatible_devices(&project, led);
    assert!(!devices.is_empty());
    assert!(devices.iter().all(|(_, r)| r.code == MappingCode::PlatformMismatch));
}

#[test]
fn cloud_part_needs_hosting_controller() {
    let mut builder = DeviceLibrary::builder();
    let led = builder.add_generic(common::led_generic()).unwrap();
    let uno = builder.add_device(common::controller(led)).unwrap();
    let widget = builder
        .add_device(
            ActualDevice::new("blynk_led", "Blynk", "Virtual LED", DeviceType::Virtual)
                .with_platform(Platform::ArduinoAvr8, LibraryBinding::new("MP_BlynkLed"))
                .with_cloud_consume(CloudPlatform::Blynk)
                .with_compatibility(led, Compatibility::new(1).with_action(OFF, [])),
        )
        .unwrap();
    let library = builder.build();

    let mut project = Project::new("p", Platform::ArduinoAvr8);
    project.set_controller(&library, Some(uno)).unwrap();
    let slot = project.add_device("led1", led);
    project.usage_mut(slot).unwrap().use_action(OFF);

    let mapper = DeviceMapper::new(&library, MappingConfig::default());
    assert_eq!(code(&mapper, &project, slot, Candidate::Device(widget)), MappingCode::CloudPlatformMismatch);
}

#[test]
fn taken_pins_give_pin_conflict() {
    let catalog = Catalog::new();
    let (mut project, leds) = scenarios::led_crowd(&catalog, 3);
    let resolver = devmap_core::ConnectionResolver::new(&catalog.library);
    for (id, pin) in leds.iter().zip(["D2", "D3"]) {
        project.bind(&catalog.library, *id, Binding::Concrete(catalog.led_255)).unwrap();
        resolver
            .set_connection(&mut project, *id, "IN", devmap_core::ProvideRef::new(devmap_core::Owner::Controller, pin))
            .unwrap();
    }

    let mapper = DeviceMapper::new(&catalog.library, MappingConfig::default());
    assert_eq!(code(&mapper, &project, leds[2], Candidate::Device(catalog.led_255)), MappingCode::PinConflict);
    // The on-board LED needs no free pin
    assert_eq!(code(&mapper, &project, leds[2], Candidate::Device(catalog.builtin_led)), MappingCode::Ok);
    // A device already wired keeps its own pins
    assert_eq!(code(&mapper, &project, leds[0], Candidate::Device(catalog.led_255)), MappingCode::Ok);

    let relaxed = MappingConfig { check_connections: false, ..MappingConfig::default() };
    let mapper = DeviceMapper::new(&catalog.library, relaxed);
    assert_eq!(code(&mapper, &project, leds[2], Candidate::Device(catalog.led_255)), MappingCode::Ok);
}

#[test]
fn single_instance_parts_are_counted() {
    let catalog = Catalog::new();
    let (mut project, leds) = scenarios::led_crowd(&catalog, 2);
    project.bind(&catalog.library, leds[0], Binding::Concrete(catalog.builtin_led)).unwrap();
    let mapper = DeviceMapper::new(&catalog.library, MappingConfig::default());

    let devices = mapper.compute_compatible_devices(&project, leds[1]);
    assert_eq!(devices.get_device(catalog.builtin_led).unwrap().code, MappingCode::CountExceeded);
    assert_eq!(devices.get(&Candidate::Identical(leds[0])).unwrap().code, MappingCode::CountExceeded);
}

#[test]
fn aliases_sort_before_devices_and_failures_last() {
    let catalog = Catalog::new();
    let (mut project, leds) = scenarios::led_crowd(&catalog, 2);
    project.bind(&catalog.library, leds[0], Binding::Concrete(catalog.led_255)).unwrap();
    let mapper = DeviceMapper::new(&catalog.library, MappingConfig::default());

    let devices = mapper.compute_compatible_devices(&project, leds[1]);
    let order: Vec<Candidate> = devices.iter().map(|(c, _)| *c).collect();
    // led_255 serves one LED at a time, so aliasing it exceeds the count
    assert_eq!(
        order,
        [
            Candidate::Device(catalog.builtin_led),
            Candidate::Device(catalog.led_255),
            Candidate::Device(catalog.bme280),
            Candidate::Device(catalog.led_50),
            Candidate::Identical(leds[0]),
        ]
    );
    assert_eq!(devices.get_device(catalog.bme280).unwrap().code, MappingCode::UnsupportedGenericDevice);
    let first_failure = devices.iter().position(|(_, r)| !r.is_ok()).unwrap();
    assert!(devices.iter().skip(first_failure).all(|(_, r)| !r.is_ok()));
}

#[test]
fn identical_candidates_can_be_disabled() {
    let catalog = Catalog::new();
    let (mut project, leds) = scenarios::led_crowd(&catalog, 2);
    project.bind(&catalog.library, leds[0], Binding::Concrete(catalog.led_255)).unwrap();
    let config = MappingConfig { include_identical_devices: false, ..MappingConfig::default() };
    let mapper = DeviceMapper::new(&catalog.library, config);

    let devices = mapper.compute_compatible_devices(&project, leds[1]);
    assert!(devices.iter().all(|(c, _)| matches!(c, Candidate::Device(_))));
}

#[test]
fn without_controller_integrated_parts_are_not_offered() {
    let catalog = Catalog::new();
    let mut project = Project::new("p", Platform::ArduinoAvr8);
    let led = project.add_device("led1", catalog.led);
    common::use_on(&mut project, led, 0.0, 100.0);
    let mapper = DeviceMapper::new(&catalog.library, MappingConfig::default());

    let devices = mapper.compute_compatible_devices(&project, led);
    assert!(devices.get_device(catalog.builtin_led).is_none());
    assert!(devices.get_device(catalog.uno).is_none());
    assert_eq!(devices.ok_devices().collect::<Vec<_>>(), [catalog.led_255]);
}
