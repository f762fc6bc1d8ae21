//! Auto-assignment and mapping throughput on growing projects

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use devmap_core::{
    auto_assign_devices, Action, ActualDevice, Compatibility, Connection, ConnectionKind, DeviceId,
    DeviceLibrary, DeviceMapper, DeviceType, GenericDevice, GenericDeviceId, GenericKind,
    LibraryBinding, MappingConfig, Peripheral, PinRole, Platform, Port, Project, WiringMethod,
};

const PINS: usize = 16;

/// Controller with `PINS` GPIO outputs and a handful of LED parts
fn catalog() -> (DeviceLibrary, GenericDeviceId, DeviceId) {
    let mut builder = DeviceLibrary::builder();
    let led = builder
        .add_generic(GenericDevice::new("LED", GenericKind::Actuator).with_action(Action::new("On")))
        .unwrap();

    let mut board = ActualDevice::new("board", "Bench", "GPIO board", DeviceType::Controller)
        .with_platform(Platform::ArduinoEsp32, LibraryBinding::new("MP_Board"))
        .with_board("esp32dev", WiringMethod::Wire)
        .with_port(Port::new("GND").with_function(Peripheral::Power, PinRole::Gnd));
    for i in 0..PINS {
        let pin = format!("D{}", i);
        board = board
            .with_port(Port::new(pin.as_str()).with_function(Peripheral::Gpio, PinRole::DigitalOut))
            .with_connection(Connection::provide(pin.as_str(), ConnectionKind::Wire, &[pin.as_str(), "GND"]));
    }
    let board = builder.add_device(board).unwrap();

    for i in 0..4 {
        builder
            .add_device(
                ActualDevice::new(format!("led{}", i), "Bench", format!("LED {}", i), DeviceType::Peripheral)
                    .with_platform(Platform::ArduinoEsp32, LibraryBinding::new("MP_Led"))
                    .with_port(Port::new("IN").with_function(Peripheral::Gpio, PinRole::DigitalIn))
                    .with_port(Port::new("GND").with_function(Peripheral::Power, PinRole::Gnd))
                    .with_connection(Connection::consume("IN", ConnectionKind::Wire, &["IN", "GND"]))
                    .with_compatibility(led, Compatibility::new(1).with_action(devmap_core::ActionId(0), [])),
            )
            .unwrap();
    }
    (builder.build(), led, board)
}

fn project(library: &DeviceLibrary, led: GenericDeviceId, board: DeviceId, size: usize) -> Project {
    let mut project = Project::new("bench", Platform::ArduinoEsp32);
    project.set_controller(library, Some(board)).unwrap();
    for i in 0..size {
        let id = project.add_device(format!("led{}", i), led);
        project.usage_mut(id).unwrap().use_action(devmap_core::ActionId(0));
    }
    project
}

fn bench_auto_assign(c: &mut Criterion) {
    let (library, led, board) = catalog();
    let config = MappingConfig::default();
    let mut group = c.benchmark_group("auto_assign");

    for size in [4, 8, PINS] {
        let base = project(&library, led, board, size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &base, |b, base| {
            b.iter(|| {
                let mut project = base.clone();
                black_box(auto_assign_devices(&library, &mut project, &config))
            })
        });
    }
    group.finish();
}

fn bench_mapping(c: &mut Criterion) {
    let (library, led, board) = catalog();
    let base = project(&library, led, board, 8);
    let mapper = DeviceMapper::new(&library, MappingConfig::default());
    let first = base.devices().next().map(|d| d.id()).unwrap();

    c.bench_function("compute_compatible_devices", |b| {
        b.iter(|| black_box(mapper.compute_compatible_devices(&base, first)))
    });
}

criterion_group!(benches, bench_auto_assign, bench_mapping);
criterion_main!(benches);
