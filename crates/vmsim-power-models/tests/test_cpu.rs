use vmsim_power_models::cpu::empirical::EmpiricalPowerModel;
use vmsim_power_models::cpu::linear::LinearPowerModel;
use vmsim_power_models::cpu::utilization_aware::UtilizationAwarePowerModel;
use vmsim_power_models::power_model::{HostPowerModel, PowerModel, PowerState};

#[test]
fn test_linear_model() {
    let model = LinearPowerModel::new(0.4, 1.);

    assert_eq!(model.get_power(0., 0.), 0.4);
    assert_eq!(model.get_power(0., 1.), 1.);
    assert_eq!(model.get_power(0., 2.), 1.);
    assert_eq!(model.get_power(0., -0.5), 0.4);
    assert_eq!(model.get_power(0., f64::NAN), 0.4);
}

#[test]
fn test_utilization_aware_model() {
    let model = HostPowerModel::new(Box::new(UtilizationAwarePowerModel::new(0.4, 1.)));

    assert_eq!(model.get_power(0., PowerState::Idle, 0., 0.), 0.4);

    assert!(model.get_power(0., PowerState::Active, 1e-5, 0.) < 0.4 + 1e-3);
    assert!(model.get_power(0., PowerState::Active, 1e-5, 0.) > 0.4);

    assert!(model.get_power(0., PowerState::Active, 0.5, 0.) > 0.77);
    assert!(model.get_power(0., PowerState::Active, 0.5, 0.) < 0.78);

    assert_eq!(model.get_power(0., PowerState::Active, 1., 0.), 1.);
}

#[test]
fn test_empirical_model() {
    let model = EmpiricalPowerModel::system_x3550_m3_xeon_x5675();

    assert_eq!(model.get_power(0., 0.), 58.4);
    assert_eq!(model.get_power(0., 0.5), 140.);
    assert_eq!(model.get_power(0., 0.25), 113.5);
    assert_eq!(model.get_power(0., 1.), 222.);
}

#[test]
fn test_empirical_model_requires_eleven_points() {
    assert!(EmpiricalPowerModel::new(vec![1., 2., 3.]).is_none());
    assert!(EmpiricalPowerModel::new(vec![0.; 11]).is_some());
}
