pub mod calendar;
pub mod nii;
