/*!
Typed `wgpu` buffers.

The GPU evaluator moves three kinds of data across the bus: the palette
(`u32` RGBA words), escape counts (`u32`) and packed pixel colours (`u32`).
They're all `u32` on the device, so an untyped buffer would happily accept
one in place of another. Tagging each buffer with its element type keeps
sizes in elements rather than bytes, and keeps the [`bytemuck`] casts in
one place.
*/

use std::{marker::PhantomData, mem::size_of, ops::Deref};

use wgpu::util::DeviceExt;

use crate::error::Error;

pub struct Buffer<A> {
    buffer: wgpu::Buffer,
    len: u64,
    phantom_data: PhantomData<A>,
}

impl<A: bytemuck::Pod + bytemuck::Zeroable> Buffer<A> {
    pub fn write(&self, queue: &wgpu::Queue, contents: &[A]) {
        debug_assert!(contents.len() as u64 <= self.len);
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(contents));
    }

    /// Number of `A`s the buffer holds.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn binding_resource(&self) -> wgpu::BindingResource {
        self.buffer.as_entire_binding()
    }

    /**
    Map the buffer for reading and copy its contents out.

    Blocks on [`wgpu::Device::poll`] until the map completes. The buffer must
    have been created with [`wgpu::BufferUsages::MAP_READ`] and all writes to it
    submitted.
    */
    pub fn read(&self, device: &wgpu::Device) -> Result<Vec<A>, Error> {
        let slice = self.buffer.slice(..);
        let (sender, receiver) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            // The receiver only goes away if `read` has already returned.
            let _ = sender.send(result);
        });
        device.poll(wgpu::Maintain::Wait);
        receiver.recv().map_err(|_| Error::ReadbackAborted)??;

        let contents = View {
            view: slice.get_mapped_range(),
            phantom_data: PhantomData,
        }
        .to_vec();
        self.buffer.unmap();
        Ok(contents)
    }

    pub fn destroy(self) {
        self.buffer.destroy()
    }
}

struct View<'a, A> {
    view: wgpu::BufferView<'a>,
    phantom_data: PhantomData<A>,
}

impl<'a, A: bytemuck::Pod + bytemuck::Zeroable> Deref for View<'a, A> {
    type Target = [A];

    fn deref(&self) -> &Self::Target {
        bytemuck::cast_slice(&*self.view)
    }
}

enum Contents<'a> {
    Contents(&'a [u8]),
    Len(u64),
}

pub struct Builder<'a, A> {
    label: Option<&'a str>,
    contents: Contents<'a>,
    usage: wgpu::BufferUsages,
    phantom_data: PhantomData<A>,
}

impl<'a, A: bytemuck::Pod + bytemuck::Zeroable> From<&'a [A]> for Builder<'a, A> {
    fn from(value: &'a [A]) -> Self {
        Self {
            label: None,
            contents: Contents::Contents(bytemuck::cast_slice(value)),
            usage: wgpu::BufferUsages::COPY_DST,
            phantom_data: PhantomData,
        }
    }
}

impl<'a, A: bytemuck::Pod + bytemuck::Zeroable> Builder<'a, A> {
    /// An uninitialised buffer of `len` elements.
    pub fn new(len: u64) -> Self {
        Self {
            label: None,
            contents: Contents::Len(len),
            usage: wgpu::BufferUsages::empty(),
            phantom_data: PhantomData,
        }
    }

    pub fn with_label(mut self, label: &'a str) -> Self {
        self.label = Some(label);
        self
    }

    pub fn with_usage(mut self, usage: wgpu::BufferUsages) -> Self {
        self.usage |= usage;
        self
    }

    pub fn create(self, device: &wgpu::Device) -> Buffer<A> {
        let element_size = size_of::<A>() as u64;
        let (buffer, len) = match self.contents {
            Contents::Contents(contents) => (
                device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: self.label,
                    contents,
                    usage: self.usage,
                }),
                contents.len() as u64 / element_size,
            ),
            Contents::Len(len) => (
                device.create_buffer(&wgpu::BufferDescriptor {
                    label: self.label,
                    size: len * element_size,
                    usage: self.usage,
                    mapped_at_creation: false,
                }),
                len,
            ),
        };

        Buffer {
            buffer,
            len,
            phantom_data: PhantomData,
        }
    }
}

/// Copy all of `source` into the start of `destination`.
pub fn copy_buffer_to_buffer<A: bytemuck::Pod + bytemuck::Zeroable>(
    command_encoder: &mut wgpu::CommandEncoder,
    source: &Buffer<A>,
    destination: &Buffer<A>,
) {
    debug_assert!(source.len <= destination.len);
    command_encoder.copy_buffer_to_buffer(
        &source.buffer,
        0,
        &destination.buffer,
        0,
        source.len * size_of::<A>() as u64,
    )
}
