use crate::screen;

/// Workgroup size for `mandelbrot.wgsl#mandelbrot`, in both dimensions.
pub const MANDELBROT_WORKGROUP_SIZE: u32 = 8;

/**
Dispatch size for `mandelbrot.wgsl#mandelbrot`

[WGSL compute shader workgroups reference](https://www.w3.org/TR/WGSL/#compute-shader-workgroups)

The shader is invoked once per pixel, with `global_invocation_id.xy` as the
pixel coordinate. An `8×8` workgroup gives 64 invocations per workgroup,
which fills a streaming multiprocessor on most desktop cards.

The grid has to cover the whole viewport, so each dimension is rounded up to
a whole number of workgroups. Invocations that land past the right or bottom
edge return without writing anything.

Each dimension stays well under
[maxComputeWorkgroupsPerDimension](https://www.w3.org/TR/webgpu/#dom-supported-limits-maxcomputeworkgroupsperdimension)
(65535): that would take a viewport over half a million pixels wide.
*/
pub fn mandelbrot_dispatch_size(viewport: screen::Size) -> (u32, u32, u32) {
    (
        div_ceil(viewport.width, MANDELBROT_WORKGROUP_SIZE),
        div_ceil(viewport.height, MANDELBROT_WORKGROUP_SIZE),
        1,
    )
}

fn div_ceil(value: u32, divisor: u32) -> u32 {
    (value + divisor - 1) / divisor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn covers_viewport() {
        assert_eq!(mandelbrot_dispatch_size(screen::Size::new(8, 8)), (1, 1, 1));
        assert_eq!(mandelbrot_dispatch_size(screen::Size::new(9, 7)), (2, 1, 1));
        assert_eq!(
            mandelbrot_dispatch_size(screen::Size::new(640, 480)),
            (80, 60, 1)
        );
        assert_eq!(
            mandelbrot_dispatch_size(screen::Size::new(3840, 2161)),
            (480, 271, 1)
        );
    }

    #[test]
    fn empty_viewport_dispatches_nothing() {
        assert_eq!(mandelbrot_dispatch_size(screen::Size::new(0, 100)), (0, 13, 1));
    }
}
