use ash::vk;

///Non-owning reference to a queue of a [Device](crate::context::Device). Queues are destroyed together with their
/// device, so this never destroys anything.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Queue {
    pub inner: vk::Queue,
    pub family_index: u32,
    ///Index of the queue within its family.
    pub queue_index: u32,
}

impl Queue {
    pub fn new(family_index: u32, queue_index: u32, inner: vk::Queue) -> Self {
        Queue {
            inner,
            family_index,
            queue_index,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.inner != vk::Queue::null()
    }

    pub fn handle(&self) -> vk::Queue {
        self.inner
    }
}

///A request for `priorities.len()` queues from one family.
#[derive(Clone, Debug, PartialEq)]
pub struct QueueRequest {
    ///The family's index.
    pub family_index: u32,
    ///The length of this vector determines how many queues of this family are created. The number determines the
    /// priority of each queue on the hardware. See the [documentation](https://www.khronos.org/registry/vulkan/specs/1.3-extensions/man/html/VkDeviceQueueCreateInfo.html) for more information about this topic.
    pub priorities: Vec<f32>,
}

impl QueueRequest {
    pub fn as_create_info(&self) -> vk::DeviceQueueCreateInfo<'_> {
        vk::DeviceQueueCreateInfo::default()
            .queue_family_index(self.family_index)
            .queue_priorities(&self.priorities)
    }
}
