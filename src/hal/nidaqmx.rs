//! Minimal wrapper over the analog-input part of the NI-DAQmx C library.
//!
//! [`NiTask`] owns one DAQmx task handle and maps its methods onto the DAQmx
//! C functions needed for continuous voltage acquisition. [`NiDaqmxSource`]
//! adapts a task to [`AcquisitionSource`], and [`NiDaqmxDriver`] enumerates
//! the devices known to the local driver.
//!
//! Driver failures are converted into [`DaqError`] values carrying the
//! extended error text from `DAQmxGetExtendedErrorInfo`; nothing here panics.
//!
//! Only compiled with the `nidaqmx` cargo feature, since linking requires the
//! vendor library.

use crate::core::{DaqError, DaqResult, SampleBlock};
use crate::core::channels::physical_name;
use crate::hal::{
    AcquisitionDriver, AcquisitionSource, DeviceInfo, ReadRequest, SampleCount,
    SourceSettings, TriggerSlope,
};
use anyhow::Result;
use async_trait::async_trait;
use std::ffi::{CStr, CString};

type CConstStr = *const libc::c_char;
type CCharBuf = *mut libc::c_char;
type CFloat64 = libc::c_double;
type CUint32 = libc::c_uint;
type CUint64 = libc::c_ulonglong;
type CBool32 = libc::c_uint;
type CInt32 = libc::c_int;
pub type TaskHandle = *mut libc::c_void;

pub const DAQMX_VAL_CFG_DEFAULT: CInt32 = -1;
pub const DAQMX_VAL_VOLTS: CInt32 = 10348;
pub const DAQMX_VAL_RISING: CInt32 = 10280;
pub const DAQMX_VAL_RISING_SLOPE: CInt32 = 10280;
pub const DAQMX_VAL_FALLING_SLOPE: CInt32 = 10171;
pub const DAQMX_VAL_CONTSAMPS: CInt32 = 10123;
pub const DAQMX_VAL_GROUPBYCHANNEL: CBool32 = 0;
pub const DAQMX_VAL_WAITINFINITELY: CFloat64 = -1.0;

const MIN_VOLTAGE: f64 = -10.0;
const MAX_VOLTAGE: f64 = 10.0;
const NAME_BUFFER_SIZE: usize = 4096;

#[link(name = "NIDAQmx")]
extern "C" {
    fn DAQmxGetExtendedErrorInfo(errorString: CCharBuf, bufferSize: CUint32) -> CInt32;
    fn DAQmxGetSysDevNames(data: CCharBuf, bufferSize: CUint32) -> CInt32;
    fn DAQmxGetDevAIPhysicalChans(device: CConstStr, data: CCharBuf, bufferSize: CUint32) -> CInt32;

    fn DAQmxCreateTask(taskName: CConstStr, taskHandle_ptr: &mut TaskHandle) -> CInt32;
    fn DAQmxStartTask(handle: TaskHandle) -> CInt32;
    fn DAQmxStopTask(handle: TaskHandle) -> CInt32;
    fn DAQmxClearTask(handle: TaskHandle) -> CInt32;

    fn DAQmxCreateAIVoltageChan(
        handle: TaskHandle,
        physicalChannel: CConstStr,
        nameToAssignToChannel: CConstStr,
        terminalConfig: CInt32,
        minVal: CFloat64,
        maxVal: CFloat64,
        units: CInt32,
        customScaleName: CConstStr,
    ) -> CInt32;
    fn DAQmxCfgSampClkTiming(
        handle: TaskHandle,
        src: CConstStr,
        rate: CFloat64,
        activeEdge: CInt32,
        sampleMode: CInt32,
        sampsPerChan: CUint64,
    ) -> CInt32;
    fn DAQmxCfgAnlgEdgeRefTrig(
        handle: TaskHandle,
        triggerSource: CConstStr,
        triggerSlope: CInt32,
        triggerLevel: CFloat64,
        pretriggerSamples: CUint32,
    ) -> CInt32;

    fn DAQmxGetReadAvailSampPerChan(handle: TaskHandle, data: *mut CUint32) -> CInt32;
    fn DAQmxReadAnalogF64(
        handle: TaskHandle,
        numSampsPerChan: CInt32,
        timeout: CFloat64,
        fillMode: CBool32,
        readArray: *mut CFloat64,
        arraySizeInSamps: CUint32,
        sampsPerChanRead: *mut CInt32,
        reserved: *mut CBool32,
    ) -> CInt32;
}

/// Calls a DAQmx C-function and turns a negative status into the driver's
/// extended error message. Positive status codes are warnings and pass.
fn daqmx_call<F: FnOnce() -> CInt32>(func: F) -> Result<(), String> {
    let err_code = func();
    if err_code >= 0 {
        return Ok(());
    }

    let mut err_buff = [0 as libc::c_char; 2048];
    unsafe {
        DAQmxGetExtendedErrorInfo(err_buff.as_mut_ptr(), err_buff.len() as CUint32);
    }
    let message = unsafe { CStr::from_ptr(err_buff.as_ptr()) }
        .to_string_lossy()
        .into_owned();
    Err(format!("DAQmx error {}: {}", err_code, message))
}

fn c_string(value: &str) -> Result<CString, String> {
    CString::new(value).map_err(|_| format!("'{}' contains an interior NUL byte", value))
}

fn read_name_list<F: FnOnce(CCharBuf, CUint32) -> CInt32>(func: F) -> Result<Vec<String>, String> {
    let mut buff = vec![0 as libc::c_char; NAME_BUFFER_SIZE];
    daqmx_call(|| func(buff.as_mut_ptr(), NAME_BUFFER_SIZE as CUint32))?;
    let joined = unsafe { CStr::from_ptr(buff.as_ptr()) }.to_string_lossy().into_owned();
    Ok(joined
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect())
}

/// One NI-DAQmx task handle. The task is cleared on drop.
pub struct NiTask {
    handle: TaskHandle,
}

// DAQmx task handles are not tied to the thread that created them.
unsafe impl Send for NiTask {}

impl NiTask {
    pub fn new(name: &str) -> Result<Self, String> {
        let mut handle: TaskHandle = std::ptr::null_mut();
        let name_cstr = c_string(name)?;
        daqmx_call(|| unsafe { DAQmxCreateTask(name_cstr.as_ptr(), &mut handle) })?;
        Ok(Self { handle })
    }

    pub fn create_ai_voltage_chan(&self, physical: &str) -> Result<(), String> {
        let physical_cstr = c_string(physical)?;
        let assigned_cstr = c_string("")?;
        daqmx_call(|| unsafe {
            DAQmxCreateAIVoltageChan(
                self.handle,
                physical_cstr.as_ptr(),
                assigned_cstr.as_ptr(),
                DAQMX_VAL_CFG_DEFAULT,
                MIN_VOLTAGE,
                MAX_VOLTAGE,
                DAQMX_VAL_VOLTS,
                std::ptr::null(),
            )
        })
    }

    /// Continuous sampling; `samps_per_chan` sizes the driver buffer
    pub fn cfg_sample_clk(&self, rate: f64, samps_per_chan: u64) -> Result<(), String> {
        let src_cstr = c_string("")?;
        daqmx_call(|| unsafe {
            DAQmxCfgSampClkTiming(
                self.handle,
                src_cstr.as_ptr(),
                rate as CFloat64,
                DAQMX_VAL_RISING,
                DAQMX_VAL_CONTSAMPS,
                samps_per_chan as CUint64,
            )
        })
    }

    pub fn cfg_anlg_edge_ref_trig(
        &self,
        source: &str,
        slope: TriggerSlope,
        level: f64,
        pretrigger_samples: u32,
    ) -> Result<(), String> {
        let source_cstr = c_string(source)?;
        let slope = match slope {
            TriggerSlope::Rising => DAQMX_VAL_RISING_SLOPE,
            TriggerSlope::Falling => DAQMX_VAL_FALLING_SLOPE,
        };
        daqmx_call(|| unsafe {
            DAQmxCfgAnlgEdgeRefTrig(
                self.handle,
                source_cstr.as_ptr(),
                slope,
                level as CFloat64,
                pretrigger_samples as CUint32,
            )
        })
    }

    pub fn start(&self) -> Result<(), String> {
        daqmx_call(|| unsafe { DAQmxStartTask(self.handle) })
    }

    pub fn stop(&self) -> Result<(), String> {
        daqmx_call(|| unsafe { DAQmxStopTask(self.handle) })
    }

    pub fn avail_samp_per_chan(&self) -> Result<usize, String> {
        let mut data: CUint32 = 0;
        daqmx_call(|| unsafe { DAQmxGetReadAvailSampPerChan(self.handle, &mut data as *mut CUint32) })?;
        Ok(data as usize)
    }

    /// Read `samps_per_chan` samples for every channel, grouped by channel
    pub fn read_analog(
        &self,
        samps_per_chan: usize,
        num_channels: usize,
        timeout: f64,
    ) -> Result<Vec<f64>, String> {
        let mut buffer = vec![0.0f64; samps_per_chan * num_channels];
        let mut nread: CInt32 = 0;
        daqmx_call(|| unsafe {
            DAQmxReadAnalogF64(
                self.handle,
                samps_per_chan as CInt32,
                timeout as CFloat64,
                DAQMX_VAL_GROUPBYCHANNEL,
                buffer.as_mut_ptr(),
                buffer.len() as CUint32,
                &mut nread as *mut CInt32,
                std::ptr::null_mut(),
            )
        })?;

        let nread = nread.max(0) as usize;
        if nread < samps_per_chan {
            // Grouped by channel: each channel's run starts at a multiple of samps_per_chan
            let compacted = buffer
                .chunks(samps_per_chan.max(1))
                .flat_map(|ch| ch[..nread].iter().copied())
                .collect();
            return Ok(compacted);
        }
        Ok(buffer)
    }

    fn clear(&mut self) -> Result<(), String> {
        if self.handle.is_null() {
            return Ok(());
        }
        let result = daqmx_call(|| unsafe { DAQmxClearTask(self.handle) });
        self.handle = std::ptr::null_mut();
        result
    }
}

impl Drop for NiTask {
    fn drop(&mut self) {
        if let Err(e) = self.clear() {
            log::warn!("Clearing DAQmx task failed: {}", e);
        }
    }
}

/// `AcquisitionSource` backed by one NI-DAQmx analog-input task
pub struct NiDaqmxSource {
    task: Option<NiTask>,
    num_channels: usize,
}

impl NiDaqmxSource {
    pub fn new() -> Self {
        Self {
            task: None,
            num_channels: 0,
        }
    }

    fn task(&self) -> DaqResult<&NiTask> {
        self.task
            .as_ref()
            .ok_or_else(|| DaqError::read("DAQmx task is not configured"))
    }
}

impl Default for NiDaqmxSource {
    fn default() -> Self {
        Self::new()
    }
}

impl AcquisitionSource for NiDaqmxSource {
    fn configure(&mut self, settings: &SourceSettings) -> DaqResult<()> {
        let task = NiTask::new(&settings.task_name).map_err(DaqError::Configuration)?;

        for physical in settings.channels.physical_names(&settings.device) {
            task.create_ai_voltage_chan(&physical)
                .map_err(DaqError::Configuration)?;
        }
        task.cfg_sample_clk(
            settings.sampling_rate_hz,
            settings.samples_per_channel as u64,
        )
        .map_err(DaqError::Configuration)?;

        if let Some(trigger) = &settings.trigger {
            task.cfg_anlg_edge_ref_trig(
                &physical_name(&settings.device, &trigger.source),
                trigger.slope,
                trigger.level,
                trigger.pretrigger_samples as u32,
            )
            .map_err(DaqError::Configuration)?;
        }

        self.num_channels = settings.channels.len();
        self.task = Some(task);
        Ok(())
    }

    fn start(&mut self) -> DaqResult<()> {
        self.task()?.start().map_err(DaqError::Configuration)
    }

    fn available_samples(&mut self) -> DaqResult<usize> {
        self.task()?.avail_samp_per_chan().map_err(DaqError::HardwareRead)
    }

    fn read(&mut self, request: ReadRequest) -> DaqResult<SampleBlock> {
        let task = self.task()?;
        let samps_per_chan = match request.count {
            SampleCount::PerChannel(n) => n,
            SampleCount::All => task.avail_samp_per_chan().map_err(DaqError::HardwareRead)?,
        };
        let timeout = request
            .timeout
            .map_or(DAQMX_VAL_WAITINFINITELY, |t| t.as_secs_f64());

        let data = task
            .read_analog(samps_per_chan, self.num_channels, timeout)
            .map_err(DaqError::HardwareRead)?;
        SampleBlock::from_grouped(data, self.num_channels)
    }

    fn close(&mut self) -> DaqResult<()> {
        let Some(mut task) = self.task.take() else {
            return Ok(());
        };
        if let Err(e) = task.stop() {
            log::debug!("Stopping DAQmx task before clear failed: {}", e);
        }
        task.clear().map_err(DaqError::HardwareRead)
    }
}

/// Driver enumerating devices registered with the local NI-DAQmx installation
pub struct NiDaqmxDriver;

impl NiDaqmxDriver {
    pub const DRIVER_ID: &'static str = "nidaqmx";

    pub fn new() -> Self {
        Self
    }
}

impl Default for NiDaqmxDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AcquisitionDriver for NiDaqmxDriver {
    fn driver_id(&self) -> &str {
        Self::DRIVER_ID
    }

    async fn discover_devices(&self) -> Result<Vec<DeviceInfo>> {
        // Driver queries may block; keep them off the async workers
        tokio::task::spawn_blocking(|| {
            let names = read_name_list(|buf, len| unsafe { DAQmxGetSysDevNames(buf, len) })
                .map_err(anyhow::Error::msg)?;

            let mut devices = Vec::with_capacity(names.len());
            for name in names {
                let name_cstr = c_string(&name).map_err(anyhow::Error::msg)?;
                let inputs = read_name_list(|buf, len| unsafe {
                    DAQmxGetDevAIPhysicalChans(name_cstr.as_ptr(), buf, len)
                })
                .map_err(anyhow::Error::msg)?;

                devices.push(DeviceInfo {
                    id: name.clone(),
                    name,
                    driver_id: Self::DRIVER_ID.to_string(),
                    analog_inputs: inputs
                        .iter()
                        .filter_map(|p| p.rsplit('/').next().map(str::to_string))
                        .collect(),
                });
            }
            Ok::<_, anyhow::Error>(devices)
        })
        .await?
    }

    fn create_source(&self, _device_id: &str) -> Result<Box<dyn AcquisitionSource>> {
        Ok(Box::new(NiDaqmxSource::new()))
    }
}
