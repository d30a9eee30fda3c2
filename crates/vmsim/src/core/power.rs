//! Host power consumption and energy accumulation.

use crate::core::host::Host;

/// Returns the current power consumption of the host in watts.
///
/// Hosts that were never activated draw nothing, idle hosts draw their idle power.
pub fn instantaneous_power(host: &Host, time: f64) -> f64 {
    let (cpu_load, memory_load) = host.utilization();
    host.power_model().get_power(time, host.power_state(), cpu_load, memory_load)
}

/// Adds the energy consumed by the host during `elapsed` seconds at its current power.
///
/// Must be called once per host per tick. Returns the added energy in joules.
pub fn accumulate(host: &mut Host, time: f64, elapsed: f64) -> f64 {
    let power = instantaneous_power(host, time);
    host.energy_meter_mut().accumulate(power, elapsed)
}

/// Returns the summary power consumption of the hosts.
pub fn total_power<'a>(hosts: impl IntoIterator<Item = &'a Host>, time: f64) -> f64 {
    hosts.into_iter().map(|host| instantaneous_power(host, time)).sum()
}
